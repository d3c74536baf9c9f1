//! Versioned store client: namespaced raw access and change counters.

use std::sync::Arc;

use imgboard_core::{CacheError, CacheResult};

use super::namespace::{KeyLayout, Namespace};
use super::traits::KvStore;

/// Thin wrapper over a [`KvStore`] that speaks in namespaces.
///
/// Store errors propagate unchanged; nothing here retries.
pub struct VersionedStoreClient<K: KvStore> {
    store: Arc<K>,
    layout: KeyLayout,
}

impl<K: KvStore> VersionedStoreClient<K> {
    pub fn new(store: Arc<K>, layout: KeyLayout) -> Self {
        Self { store, layout }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Raw read of an entry.
    pub async fn get(&self, namespace: Namespace, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.store
            .get(&self.layout.entry_key(namespace, key))
            .await
    }

    /// Raw write of an entry, without expiry.
    pub async fn set(&self, namespace: Namespace, key: &str, bytes: &[u8]) -> CacheResult<()> {
        self.store
            .set(&self.layout.entry_key(namespace, key), bytes)
            .await
    }

    /// Atomically bump the namespace counter and return the new value.
    pub async fn increment_counter(&self, namespace: Namespace) -> CacheResult<i64> {
        self.store.incr(&self.layout.counter_key(namespace)).await
    }

    /// Current namespace counter, `None` if it was never incremented.
    pub async fn read_counter(&self, namespace: Namespace) -> CacheResult<Option<i64>> {
        let key = self.layout.counter_key(namespace);
        match self.store.get(&key).await? {
            None => Ok(None),
            Some(raw) => std::str::from_utf8(&raw)
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map(Some)
                .ok_or_else(|| CacheError::CorruptCounter {
                    key,
                    value: String::from_utf8_lossy(&raw).into_owned(),
                }),
        }
    }
}

impl<K: KvStore> Clone for VersionedStoreClient<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            layout: self.layout.clone(),
        }
    }
}
