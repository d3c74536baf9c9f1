//! In-process key-value store.

use std::collections::HashMap;

use async_trait::async_trait;
use imgboard_core::{CacheError, CacheResult};
use tokio::sync::Mutex;

use super::traits::KvStore;

/// In-memory key-value store.
///
/// Counters are stored the way Redis stores them (decimal ASCII), and `incr`
/// performs its read-modify-write while holding the map lock, so concurrent
/// increments never lose updates.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored (entries and counters).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if no key is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Returns true if `key` is physically present, regardless of staleness.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut entries = self.entries.lock().await;
        let current = match entries.get(key) {
            None => 0,
            Some(raw) => std::str::from_utf8(raw)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| CacheError::CorruptCounter {
                    key: key.to_string(),
                    value: String::from_utf8_lossy(raw).into_owned(),
                })?,
        };
        // Redis refuses to increment past i64::MAX; so do we.
        let next = current
            .checked_add(1)
            .ok_or_else(|| CacheError::CorruptCounter {
                key: key.to_string(),
                value: format!("{} (increment would overflow)", current),
            })?;
        entries.insert(key.to_string(), next.to_string().into_bytes());
        Ok(next)
    }
}
