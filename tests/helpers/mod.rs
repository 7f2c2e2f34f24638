#![allow(dead_code)]

use chrono::{DateTime, Utc};
use ebb::config::RateLimitConfig;
use ebb::error::StoreError;
use ebb::graph::requests::{AddObservationRequest, CreateEntityRequest, CreateRelationRequest};
use ebb::graph::types::ObservationInput;
use ebb::graph::GraphService;
use ebb::ratelimit::RateLimiter;
use ebb::store::{KvDocumentStore, KvEntry, KvStore, MemoryKv, WriteMode};
use std::sync::Arc;

/// Identity that skips every quota, so scenario tests can use fixed clocks.
pub const OWNER: &str = "owner";

pub fn rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        exempt_identity: Some(OWNER.into()),
        ..RateLimitConfig::default()
    }
}

/// Build a service whose documents and counters share one key-value store.
pub fn service_on(kv: Arc<dyn KvStore>, mode: WriteMode, rate_limit: RateLimitConfig) -> GraphService {
    let documents = KvDocumentStore::new(kv.clone(), "graph", mode);
    GraphService::new(Arc::new(documents), RateLimiter::new(kv, rate_limit))
}

/// A fresh in-memory service. Returns the store too so tests can inspect it.
pub fn test_service() -> (GraphService, Arc<MemoryKv>) {
    let kv = Arc::new(MemoryKv::new());
    let service = service_on(kv.clone(), WriteMode::LastWriteWins, rate_limit());
    (service, kv)
}

pub fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
}

pub fn entity(name: &str, entity_type: &str, observations: &[&str]) -> CreateEntityRequest {
    CreateEntityRequest {
        name: Some(name.into()),
        entity_type: Some(entity_type.into()),
        observations: Some(
            observations
                .iter()
                .map(|text| ObservationInput::Text((*text).into()))
                .collect(),
        ),
    }
}

pub fn observation(name: &str, text: &str, expires_at: Option<&str>) -> AddObservationRequest {
    AddObservationRequest {
        name: Some(name.into()),
        observation: Some(text.into()),
        expires_at: expires_at.map(Into::into),
    }
}

pub fn relation(source: &str, verb: &str, target: &str) -> CreateRelationRequest {
    CreateRelationRequest {
        source: Some(source.into()),
        relation: Some(verb.into()),
        target: Some(target.into()),
        expires_at: None,
    }
}

/// A store whose every call fails, standing in for an unreachable backend.
pub struct FailingKv;

fn unreachable() -> StoreError {
    StoreError::Setup("backend unreachable".into())
}

impl KvStore for FailingKv {
    fn get(&self, _key: &str) -> Result<Option<KvEntry>, StoreError> {
        Err(unreachable())
    }

    fn put(&self, _key: &str, _value: &str, _expires_at: Option<DateTime<Utc>>) -> Result<u64, StoreError> {
        Err(unreachable())
    }

    fn put_if_version(&self, _key: &str, _value: &str, _expected: u64) -> Result<Option<u64>, StoreError> {
        Err(unreachable())
    }

    fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(unreachable())
    }

    fn sweep_expired(&self) -> Result<usize, StoreError> {
        Err(unreachable())
    }
}
