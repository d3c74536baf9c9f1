//! Entity cache accessors.
//!
//! [`VersionedCache`] implements the versioned read/write state machine over
//! raw content strings. [`EntityCache`] binds it to one namespace and one
//! entity type, so every access pattern shares a single implementation.
//!
//! # Validity
//!
//! An entry is served only when the namespace counter exists and the
//! entry's stamped version is at least the counter. Writing any key mints a
//! new version through the counter, which also raises the bar for every
//! other key in the namespace.

use std::marker::PhantomData;
use std::sync::Arc;

use imgboard_core::{CacheError, CacheResult};
use tracing::{debug, warn};

use super::client::VersionedStoreClient;
use super::container::VersionedContainer;
use super::namespace::{KeyLayout, Namespace};
use super::stats::StatsRecorder;
use super::traits::{CacheableEntity, KvStore};

/// Why a read did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// The namespace counter was never incremented.
    NoCounter,
    /// No entry under the key.
    Absent,
    /// Entry or counter could not be decoded.
    Corrupt,
    /// Entry exists but the counter has moved past its version.
    Stale { version: i64, counter: i64 },
}

/// Outcome of a cache read. A miss is a control signal, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss(MissReason),
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        !self.is_hit()
    }

    /// The value on a hit.
    pub fn hit(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss(_) => None,
        }
    }

    pub fn miss_reason(&self) -> Option<MissReason> {
        match self {
            CacheLookup::Hit(_) => None,
            CacheLookup::Miss(reason) => Some(*reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheLookup<U> {
        match self {
            CacheLookup::Hit(value) => CacheLookup::Hit(f(value)),
            CacheLookup::Miss(reason) => CacheLookup::Miss(reason),
        }
    }
}

// ============================================================================
// RAW ACCESSOR
// ============================================================================

/// Versioned read/write over raw content strings.
pub struct VersionedCache<K: KvStore> {
    client: VersionedStoreClient<K>,
}

impl<K: KvStore> VersionedCache<K> {
    pub fn new(store: Arc<K>, layout: KeyLayout) -> Self {
        Self {
            client: VersionedStoreClient::new(store, layout),
        }
    }

    pub fn client(&self) -> &VersionedStoreClient<K> {
        &self.client
    }

    /// Read the content stored under `key`.
    ///
    /// Store failures are returned as errors; everything else that prevents
    /// serving the entry is a [`CacheLookup::Miss`].
    pub async fn read(&self, namespace: Namespace, key: &str) -> CacheResult<CacheLookup<String>> {
        if KeyLayout::is_reserved(key) {
            return Ok(CacheLookup::Miss(MissReason::Absent));
        }

        let counter = match self.client.read_counter(namespace).await {
            Ok(Some(counter)) => counter,
            Ok(None) => return Ok(CacheLookup::Miss(MissReason::NoCounter)),
            Err(CacheError::CorruptCounter { key: counter_key, value }) => {
                warn!(%namespace, counter_key = %counter_key, value = %value, "Corrupt change counter");
                return Ok(CacheLookup::Miss(MissReason::Corrupt));
            }
            Err(e) => return Err(e),
        };

        let raw = match self.client.get(namespace, key).await? {
            Some(raw) => raw,
            None => return Ok(CacheLookup::Miss(MissReason::Absent)),
        };

        let container = match VersionedContainer::decode(&raw) {
            Ok(container) => container,
            Err(e) => {
                warn!(%namespace, key, error = %e, "Discarding undecodable cache entry");
                return Ok(CacheLookup::Miss(MissReason::Corrupt));
            }
        };

        if container.is_stale(counter) {
            return Ok(CacheLookup::Miss(MissReason::Stale {
                version: container.version,
                counter,
            }));
        }

        Ok(CacheLookup::Hit(container.content))
    }

    /// Mint a new version for `namespace` and store `content` under it.
    ///
    /// Returns the version stamped on the entry, or `None` when the key is
    /// reserved and nothing was written.
    pub async fn write(
        &self,
        namespace: Namespace,
        key: &str,
        content: &str,
    ) -> CacheResult<Option<i64>> {
        if KeyLayout::is_reserved(key) {
            debug!(%namespace, key, "Skipping cache write for reserved key");
            return Ok(None);
        }

        let version = self.client.increment_counter(namespace).await?;
        let bytes = VersionedContainer::new(version, content)
            .encode()
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        self.client.set(namespace, key, &bytes).await?;

        Ok(Some(version))
    }

    /// Invalidate every entry in `namespace`. Returns the new counter.
    pub async fn invalidate_namespace(&self, namespace: Namespace) -> CacheResult<i64> {
        self.client.increment_counter(namespace).await
    }
}

impl<K: KvStore> Clone for VersionedCache<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

// ============================================================================
// TYPED ACCESSOR
// ============================================================================

/// Typed accessor for one namespace holding values of type `T`.
///
/// Content is the JSON text of `T`. A payload that no longer deserializes as
/// `T` is a miss.
pub struct EntityCache<K: KvStore, T: CacheableEntity> {
    cache: VersionedCache<K>,
    namespace: Namespace,
    stats: Arc<StatsRecorder>,
    _marker: PhantomData<fn() -> T>,
}

impl<K: KvStore, T: CacheableEntity> EntityCache<K, T> {
    /// Bind `T` to `namespace`. The namespace must hold `T`'s entity type.
    pub fn new(cache: VersionedCache<K>, namespace: Namespace, stats: Arc<StatsRecorder>) -> Self {
        debug_assert_eq!(
            namespace.entity_type(),
            T::entity_type(),
            "namespace {} does not hold this entity type",
            namespace
        );
        Self {
            cache,
            namespace,
            stats,
            _marker: PhantomData,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Read the value under `key`, recording the outcome.
    pub async fn read(&self, key: &str) -> CacheResult<CacheLookup<T>> {
        let namespace = self.namespace;
        let lookup = match self.cache.read(namespace, key).await? {
            CacheLookup::Hit(content) => match serde_json::from_str::<T>(&content) {
                Ok(value) => CacheLookup::Hit(value),
                Err(e) => {
                    warn!(
                        %namespace,
                        entity_type = %T::entity_type(),
                        key,
                        error = %e,
                        "Cached content does not match entity type"
                    );
                    CacheLookup::Miss(MissReason::Corrupt)
                }
            },
            CacheLookup::Miss(reason) => CacheLookup::Miss(reason),
        };

        match lookup.miss_reason() {
            None => {
                self.stats.record_hit();
                debug!(%namespace, key, "Cache hit");
            }
            Some(MissReason::Stale { version, counter }) => {
                self.stats.record_miss();
                self.stats.record_stale();
                debug!(%namespace, key, version, counter, "Stale cache entry");
            }
            Some(MissReason::Corrupt) => {
                self.stats.record_miss();
                self.stats.record_corrupt();
            }
            Some(reason) => {
                self.stats.record_miss();
                debug!(%namespace, key, ?reason, "Cache miss");
            }
        }

        Ok(lookup)
    }

    /// Store `value` under `key` with a freshly minted version.
    pub async fn write(&self, key: &str, value: &T) -> CacheResult<Option<i64>> {
        let content = serde_json::to_string(value).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let version = self.cache.write(self.namespace, key, &content).await?;
        if let Some(version) = version {
            debug!(namespace = %self.namespace, key, version, "Cache populated");
        }
        Ok(version)
    }

    /// Invalidate the whole namespace.
    pub async fn invalidate(&self) -> CacheResult<i64> {
        self.cache.invalidate_namespace(self.namespace).await
    }
}

impl<K: KvStore, T: CacheableEntity> Clone for EntityCache<K, T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            namespace: self.namespace,
            stats: Arc::clone(&self.stats),
            _marker: PhantomData,
        }
    }
}
