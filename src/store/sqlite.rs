//! SQLite-backed key-value store.
//!
//! One `kv` table holds every key: the graph document and the short-lived rate-limit
//! counters. Expiry is stored as unix milliseconds and enforced on read.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{is_live, KvEntry, KvStore};
use crate::error::StoreError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    version INTEGER NOT NULL,
    expires_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at);
"#;

pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Open (or create) the store at `path`, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Setup(format!("failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_SQL)?;

        tracing::info!(path = %path.display(), "key-value store initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Version of the live row at `key`, or 0 if absent or expired.
fn live_version(tx: &Transaction, key: &str, now: DateTime<Utc>) -> Result<u64, StoreError> {
    let row: Option<(i64, Option<i64>)> = tx
        .query_row(
            "SELECT version, expires_at FROM kv WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(match row {
        Some((version, expires_at)) if is_live(expires_at.and_then(from_millis), now) => {
            version as u64
        }
        _ => 0,
    })
}

fn upsert(
    tx: &Transaction,
    key: &str,
    value: &str,
    version: u64,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO kv (key, value, version, expires_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, version = excluded.version, \
         expires_at = excluded.expires_at",
        params![
            key,
            value,
            version as i64,
            expires_at.map(|at| at.timestamp_millis())
        ],
    )?;
    Ok(())
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<KvEntry>, StoreError> {
        let conn = self.lock()?;
        let row: Option<(String, i64, Option<i64>)> = conn
            .query_row(
                "SELECT value, version, expires_at FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row
            .filter(|(_, _, expires_at)| is_live(expires_at.and_then(from_millis), Utc::now()))
            .map(|(value, version, _)| KvEntry {
                value,
                version: version as u64,
            }))
    }

    fn put(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let version = live_version(&tx, key, Utc::now())? + 1;
        upsert(&tx, key, value, version, expires_at)?;
        tx.commit()?;
        Ok(version)
    }

    fn put_if_version(
        &self,
        key: &str,
        value: &str,
        expected: u64,
    ) -> Result<Option<u64>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = live_version(&tx, key, Utc::now())?;
        if current != expected {
            return Ok(None);
        }
        upsert(&tx, key, value, current + 1, None)?;
        tx.commit()?;
        Ok(Some(current + 1))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn sweep_expired(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![Utc::now().timestamp_millis()],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn missing_key_reads_as_none() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert!(kv.get("graph").unwrap().is_none());
    }

    #[test]
    fn put_bumps_version() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert_eq!(kv.put("graph", "{}", None).unwrap(), 1);
        assert_eq!(kv.put("graph", "{\"a\":1}", None).unwrap(), 2);

        let entry = kv.get("graph").unwrap().unwrap();
        assert_eq!(entry.value, "{\"a\":1}");
        assert_eq!(entry.version, 2);
    }

    #[test]
    fn expired_rows_are_invisible_and_swept() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.put("rate:a:reads", "1", Some(Utc::now() - Duration::seconds(1)))
            .unwrap();
        kv.put("rate:b:reads", "1", Some(Utc::now() + Duration::hours(1)))
            .unwrap();

        assert!(kv.get("rate:a:reads").unwrap().is_none());
        assert!(kv.get("rate:b:reads").unwrap().is_some());

        assert_eq!(kv.sweep_expired().unwrap(), 1);
        assert!(kv.get("rate:b:reads").unwrap().is_some());
    }

    #[test]
    fn expired_row_restarts_at_version_one() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.put("k", "old", Some(Utc::now() - Duration::seconds(1)))
            .unwrap();
        assert_eq!(kv.put("k", "new", None).unwrap(), 1);
    }

    #[test]
    fn put_if_version_rejects_stale_writer() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert_eq!(kv.put_if_version("graph", "first", 0).unwrap(), Some(1));
        assert_eq!(kv.put_if_version("graph", "second", 1).unwrap(), Some(2));
        assert_eq!(kv.put_if_version("graph", "stale", 1).unwrap(), None);
        assert_eq!(kv.get("graph").unwrap().unwrap().value, "second");
    }

    #[test]
    fn delete_clears_key() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.put("k", "v", None).unwrap();
        kv.delete("k").unwrap();
        assert!(kv.get("k").unwrap().is_none());
    }
}
