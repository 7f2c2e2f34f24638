//! In-process key-value store. Contents vanish with the process.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{is_live, KvEntry, KvStore};
use crate::error::StoreError;

#[derive(Debug)]
struct Slot {
    entry: KvEntry,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct MemoryKv {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>, StoreError> {
        self.slots.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn live_version(slots: &HashMap<String, Slot>, key: &str) -> u64 {
    slots
        .get(key)
        .filter(|slot| is_live(slot.expires_at, Utc::now()))
        .map_or(0, |slot| slot.entry.version)
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<KvEntry>, StoreError> {
        let slots = self.lock()?;
        Ok(slots
            .get(key)
            .filter(|slot| is_live(slot.expires_at, Utc::now()))
            .map(|slot| slot.entry.clone()))
    }

    fn put(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError> {
        let mut slots = self.lock()?;
        let version = live_version(&slots, key) + 1;
        slots.insert(
            key.to_string(),
            Slot {
                entry: KvEntry {
                    value: value.to_string(),
                    version,
                },
                expires_at,
            },
        );
        Ok(version)
    }

    fn put_if_version(
        &self,
        key: &str,
        value: &str,
        expected: u64,
    ) -> Result<Option<u64>, StoreError> {
        let mut slots = self.lock()?;
        let current = live_version(&slots, key);
        if current != expected {
            return Ok(None);
        }
        slots.insert(
            key.to_string(),
            Slot {
                entry: KvEntry {
                    value: value.to_string(),
                    version: current + 1,
                },
                expires_at: None,
            },
        );
        Ok(Some(current + 1))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn sweep_expired(&self) -> Result<usize, StoreError> {
        let mut slots = self.lock()?;
        let before = slots.len();
        let now = Utc::now();
        slots.retain(|_, slot| is_live(slot.expires_at, now));
        Ok(before - slots.len())
    }
}
