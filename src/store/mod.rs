//! Persistent store adapters.
//!
//! [`KvStore`] is the contract of the external key-value service: versioned values
//! with an optional absolute expiry. [`DocumentStore`] layers the single graph
//! document slot on top of it. Two adapters are provided: [`SqliteKv`] for on-disk
//! persistence and [`MemoryKv`] for ephemeral servers and tests.

pub mod document;
pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub use document::{DocumentStore, KvDocumentStore, Version, WriteMode};
pub use memory::MemoryKv;
pub use sqlite::SqliteKv;

/// A live value and its write version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub value: String,
    pub version: u64,
}

/// Key-value service contract.
///
/// Absent and expired keys both read as `None` and count as version 0. Every
/// successful write bumps the version by one.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<KvEntry>, StoreError>;

    /// Unconditional write. Returns the new version.
    fn put(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError>;

    /// Write only if the current version equals `expected`. Returns `None` when stale.
    fn put_if_version(&self, key: &str, value: &str, expected: u64)
        -> Result<Option<u64>, StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Physically drop every expired key. Returns the number removed.
    fn sweep_expired(&self) -> Result<usize, StoreError>;
}

fn is_live(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.map_or(true, |at| at > now)
}
