//! Error taxonomy for the graph core.
//!
//! [`StoreError`] covers failures inside a key-value adapter. [`GraphError`] is what
//! every graph operation returns; a store failure always surfaces as
//! [`GraphError::StoreUnavailable`] and is never folded into an empty success.

use serde::Serialize;
use thiserror::Error;

/// Failure inside a [`KvStore`](crate::store::KvStore) adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode value at key {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("failed to prepare store: {0}")]
    Setup(String),
}

/// Terminal failure of a single graph request.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Missing or malformed required field. Always caller-fixable.
    #[error("{0}")]
    InvalidArgument(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate entity name, duplicate relation triple, or a stale document version.
    #[error("{0}")]
    Conflict(String),

    /// Quota for the operation class is exhausted for this caller.
    #[error("rate limit exceeded: {limit} requests per {retry_after_secs}s window")]
    RateLimited { limit: u32, retry_after_secs: u64 },

    /// The key-value dependency failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl GraphError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Stable, machine-distinguishable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::RateLimited { .. } => "rate_limited",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Wire payload for this error.
    pub fn to_body(&self) -> ErrorBody {
        let (limit, retry_after) = match self {
            Self::RateLimited {
                limit,
                retry_after_secs,
            } => (Some(*limit), Some(*retry_after_secs)),
            _ => (None, None),
        };
        ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
            limit,
            retry_after,
        }
    }
}

/// Error payload shared by the HTTP and stdio surfaces.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}
