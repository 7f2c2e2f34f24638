//! Request pipeline: rate limiter → document load → pure operation → document write.
//!
//! [`GraphService`] holds no in-process lock. Concurrent requests each load their own
//! copy of the document, so two mutations that load the same version race; under
//! [`WriteMode::LastWriteWins`](crate::store::WriteMode) the later write wins and the
//! earlier one's additions are lost. That window is accepted for low write volume.
//! Switch the document store to optimistic mode to turn it into a `Conflict`.
//!
//! A failed operation never writes: the document is persisted only after the
//! in-memory operation succeeds.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::entities::{self, AccessRecorded, EntityCreated, EntityView, ObservationAdded};
use super::relations::{self, RelationCreated};
use super::requests::{AddObservationRequest, CreateEntityRequest, CreateRelationRequest};
use super::search::{self, SearchResponse};
use super::stats::{self, StatsResponse};
use super::types::GraphDocument;
use crate::error::GraphError;
use crate::ratelimit::{OperationClass, RateLimiter};
use crate::store::DocumentStore;

/// Quota state after the call that produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
}

/// An operation result together with the quota it consumed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metered<T> {
    #[serde(flatten)]
    pub value: T,
    #[serde(rename = "rateLimit")]
    pub quota: Quota,
}

pub struct GraphService {
    documents: Arc<dyn DocumentStore>,
    limiter: RateLimiter,
}

impl GraphService {
    pub fn new(documents: Arc<dyn DocumentStore>, limiter: RateLimiter) -> Self {
        Self { documents, limiter }
    }

    pub fn create_entity(
        &self,
        caller: &str,
        request: CreateEntityRequest,
        now: DateTime<Utc>,
    ) -> Result<Metered<EntityCreated>, GraphError> {
        let metered = self.mutate(caller, OperationClass::Entities, now, |doc| {
            entities::create_entity(doc, request, now)
        })?;
        tracing::info!(
            name = %metered.value.created,
            entity_type = %metered.value.entity_type,
            "entity created"
        );
        Ok(metered)
    }

    pub fn add_observation(
        &self,
        caller: &str,
        request: AddObservationRequest,
        now: DateTime<Utc>,
    ) -> Result<Metered<ObservationAdded>, GraphError> {
        let metered = self.mutate(caller, OperationClass::Observations, now, |doc| {
            entities::add_observation(doc, request, now)
        })?;
        tracing::info!(
            entity = %metered.value.to,
            text_len = metered.value.added.len(),
            expiring = metered.value.expires_at.is_some(),
            "observation added"
        );
        Ok(metered)
    }

    pub fn create_relation(
        &self,
        caller: &str,
        request: CreateRelationRequest,
        now: DateTime<Utc>,
    ) -> Result<Metered<RelationCreated>, GraphError> {
        let metered = self.mutate(caller, OperationClass::Relations, now, |doc| {
            relations::create_relation(doc, request, now)
        })?;
        tracing::info!(relation = %metered.value.created, "relation created");
        Ok(metered)
    }

    /// Record a read of `name`, boosting its active observations.
    pub fn record_access(
        &self,
        caller: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Metered<AccessRecorded>, GraphError> {
        let metered = self.mutate(caller, OperationClass::Other, now, |doc| {
            entities::record_access(doc, name, now)
        })?;
        tracing::info!(
            entity = %name,
            observations = metered.value.observations,
            "access recorded"
        );
        Ok(metered)
    }

    pub fn get_entity(
        &self,
        caller: &str,
        name: &str,
        include_expired: bool,
        now: DateTime<Utc>,
    ) -> Result<Metered<EntityView>, GraphError> {
        self.read(caller, now, |doc| {
            entities::view_entity(doc, name, include_expired, now)
        })
    }

    pub fn search(
        &self,
        caller: &str,
        query: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Metered<SearchResponse>, GraphError> {
        self.read(caller, now, |doc| {
            search::search(doc, query.unwrap_or_default(), now)
        })
    }

    pub fn stats(&self, caller: &str, now: DateTime<Utc>) -> Result<Metered<StatsResponse>, GraphError> {
        self.read(caller, now, |doc| Ok(stats::graph_stats(doc, now)))
    }

    /// Load the current document without touching any quota.
    pub fn snapshot(&self) -> Result<GraphDocument, GraphError> {
        Ok(self.documents.load()?.0)
    }

    fn admit(
        &self,
        caller: &str,
        class: OperationClass,
        now: DateTime<Utc>,
    ) -> Result<Quota, GraphError> {
        let decision = self.limiter.check(caller, class, now).map_err(|e| {
            tracing::error!(caller = %caller, class = %class, error = %e, "rate limit check failed");
            GraphError::from(e)
        })?;

        if !decision.allowed {
            tracing::warn!(caller = %caller, class = %class, limit = decision.limit, "rate limit exceeded");
            return Err(GraphError::RateLimited {
                limit: decision.limit,
                retry_after_secs: self.limiter.retry_after_secs(),
            });
        }

        Ok(Quota {
            limit: decision.limit,
            remaining: decision.remaining,
        })
    }

    fn mutate<T>(
        &self,
        caller: &str,
        class: OperationClass,
        now: DateTime<Utc>,
        operation: impl FnOnce(&mut GraphDocument) -> Result<T, GraphError>,
    ) -> Result<Metered<T>, GraphError> {
        let quota = self.admit(caller, class, now)?;
        let (mut document, version) = self.documents.load().inspect_err(log_store_failure)?;
        let value = operation(&mut document)?;
        self.documents
            .store(&document, version)
            .inspect_err(log_store_failure)?;
        Ok(Metered { value, quota })
    }

    fn read<T>(
        &self,
        caller: &str,
        now: DateTime<Utc>,
        operation: impl FnOnce(&GraphDocument) -> Result<T, GraphError>,
    ) -> Result<Metered<T>, GraphError> {
        let quota = self.admit(caller, OperationClass::Reads, now)?;
        let (document, _) = self.documents.load().inspect_err(log_store_failure)?;
        let value = operation(&document)?;
        Ok(Metered { value, quota })
    }
}

fn log_store_failure(err: &GraphError) {
    if let GraphError::StoreUnavailable(source) = err {
        tracing::error!(error = %source, "graph document store failed");
    }
}
