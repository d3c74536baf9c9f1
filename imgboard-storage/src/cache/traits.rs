//! Key-value store trait and cacheable entity marker.
//!
//! This module defines the contract a key-value backend must satisfy and
//! the marker implemented by every value the cache layer stores.

use async_trait::async_trait;
use imgboard_core::{Author, Board, CacheResult, EntityType, Post, Thread};
use serde::{de::DeserializeOwned, Serialize};

/// Key-value store trait for pluggable cache backends.
///
/// Implementations must be safe under unbounded concurrent callers. Single-key
/// operations are expected to be linearizable; the cache layer relies on
/// that rather than adding locking of its own.
///
/// # Counters
///
/// `incr` must be an atomic increment-and-return on an integer-valued key.
/// A missing key counts as zero, so the first `incr` returns 1. Counters are
/// readable through `get` as their decimal ASCII representation.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a raw value. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Write a raw value, replacing any previous one. No expiry.
    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    /// Atomically increment an integer key and return the new value.
    async fn incr(&self, key: &str) -> CacheResult<i64>;
}

/// Marker trait for types that can be cached.
///
/// Implementations must be `Clone`, `Serialize`, and `DeserializeOwned` for
/// cache storage, and `Send + Sync + 'static` so populated values can move
/// into background tasks.
pub trait CacheableEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Get the entity type for this cacheable.
    fn entity_type() -> EntityType;
}

// ============================================================================
// IMPLEMENTATIONS FOR IMGBOARD ENTITIES
// ============================================================================

impl CacheableEntity for Board {
    fn entity_type() -> EntityType {
        EntityType::Board
    }
}

impl CacheableEntity for Thread {
    fn entity_type() -> EntityType {
        EntityType::Thread
    }
}

impl CacheableEntity for Post {
    fn entity_type() -> EntityType {
        EntityType::Post
    }
}

impl CacheableEntity for Author {
    fn entity_type() -> EntityType {
        EntityType::Author
    }
}

/// Lists are cached as a single value under their secondary key.
impl<T: CacheableEntity> CacheableEntity for Vec<T> {
    fn entity_type() -> EntityType {
        T::entity_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheable_entity_types() {
        assert_eq!(Board::entity_type(), EntityType::Board);
        assert_eq!(Thread::entity_type(), EntityType::Thread);
        assert_eq!(Post::entity_type(), EntityType::Post);
        assert_eq!(Author::entity_type(), EntityType::Author);
        assert_eq!(<Vec<Thread>>::entity_type(), EntityType::Thread);
    }
}
