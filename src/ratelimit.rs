//! Fixed-window rate limiting per (caller identity, operation class).
//!
//! Each counter lives in the key-value store at `rate:{identity}:{class}` as
//! `{count, reset_at}`. `reset_at` is fixed by the first increment of a window and
//! reused by every later increment, so the window is never extended. Bursts that
//! straddle a window boundary can reach twice the nominal rate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::error::StoreError;
use crate::store::KvStore;

/// Ten years. Keeps `now + window` representable.
const MAX_WINDOW_SECS: u64 = 10 * 365 * 86_400;

/// Quota bucket an operation draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Entities,
    Observations,
    Relations,
    Reads,
    /// Anything not covered by a named class.
    Other,
}

impl OperationClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entities => "entities",
            Self::Observations => "observations",
            Self::Relations => "relations",
            Self::Reads => "reads",
            Self::Other => "default",
        }
    }
}

impl std::fmt::Display for OperationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WindowCounter {
    count: u32,
    reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self { kv, config }
    }

    pub fn limit_for(&self, class: OperationClass) -> u32 {
        match class {
            OperationClass::Entities => self.config.entities,
            OperationClass::Observations => self.config.observations,
            OperationClass::Relations => self.config.relations,
            OperationClass::Reads => self.config.reads,
            OperationClass::Other => self.config.default,
        }
    }

    /// Seconds a denied caller should wait: always the full window length.
    pub fn retry_after_secs(&self) -> u64 {
        self.config.window_secs
    }

    /// Count one call by `identity` against `class` at `now`.
    ///
    /// Store failures propagate; they never turn into an implicit allow.
    pub fn check(
        &self,
        identity: &str,
        class: OperationClass,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, StoreError> {
        let limit = self.limit_for(class);

        if self.config.exempt_identity.as_deref() == Some(identity) {
            return Ok(RateDecision {
                allowed: true,
                remaining: limit,
                limit,
            });
        }

        let key = counter_key(identity, class);
        let current = self.read_counter(&key, now)?;
        let count = current.as_ref().map_or(0, |c| c.count);

        if count >= limit {
            return Ok(RateDecision {
                allowed: false,
                remaining: 0,
                limit,
            });
        }

        let next = WindowCounter {
            count: count + 1,
            reset_at: current.map_or_else(|| now + self.window(), |c| c.reset_at),
        };
        let value = serde_json::to_string(&next).map_err(|source| StoreError::Codec {
            key: key.clone(),
            source,
        })?;
        self.kv.put(&key, &value, Some(next.reset_at))?;

        Ok(RateDecision {
            allowed: true,
            remaining: limit - next.count,
            limit,
        })
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_secs.min(MAX_WINDOW_SECS) as i64)
    }

    /// The live counter at `key`, or `None` if absent or its window has closed.
    fn read_counter(&self, key: &str, now: DateTime<Utc>) -> Result<Option<WindowCounter>, StoreError> {
        let Some(entry) = self.kv.get(key)? else {
            return Ok(None);
        };
        let counter: WindowCounter =
            serde_json::from_str(&entry.value).map_err(|source| StoreError::Codec {
                key: key.to_string(),
                source,
            })?;
        Ok(Some(counter).filter(|c| c.reset_at > now))
    }
}

fn counter_key(identity: &str, class: OperationClass) -> String {
    format!("rate:{identity}:{class}")
}
