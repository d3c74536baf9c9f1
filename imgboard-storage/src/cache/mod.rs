//! Versioned cache-aside layer over a key-value store.
//!
//! Every namespace owns a change counter. Entries are stamped with the
//! counter value minted when they were written and are valid only while that
//! stamp is not behind the counter. Invalidation is a counter bump; nothing
//! is ever deleted.
//!
//! # Layers
//!
//! - [`KvStore`]: raw get/set/incr ([`InMemoryKvStore`], [`RedisKvStore`])
//! - [`KeyLayout`] / [`Namespace`]: where entries and counters live
//! - [`VersionedStoreClient`]: namespaced raw access and counters
//! - [`VersionedContainer`]: the stored `{Version, Content}` pair
//! - [`VersionedCache`] / [`EntityCache`]: the read/write state machine
//! - [`Populator`]: detached population and invalidation tasks
//!
//! # Example
//!
//! ```ignore
//! let cache = VersionedCache::new(store, KeyLayout::new("imgboard"));
//! let boards: EntityCache<_, Board> = EntityCache::new(cache, Namespace::BoardByKey, stats);
//!
//! boards.write("a", &board).await?;
//! match boards.read("a").await? {
//!     CacheLookup::Hit(board) => { /* serve */ }
//!     CacheLookup::Miss(_) => { /* fall back to the source of truth */ }
//! }
//! ```

pub mod accessor;
pub mod client;
pub mod container;
pub mod memory;
pub mod namespace;
pub mod populate;
pub mod redis_backend;
pub mod stats;
pub mod traits;

pub use accessor::{CacheLookup, EntityCache, MissReason, VersionedCache};
pub use client::VersionedStoreClient;
pub use container::{CodecError, VersionedContainer};
pub use memory::InMemoryKvStore;
pub use namespace::{KeyLayout, Namespace, COUNTER_SUFFIX};
pub use populate::{Populator, TaskKind};
pub use redis_backend::RedisKvStore;
pub use stats::{CacheStats, StatsRecorder};
pub use traits::{CacheableEntity, KvStore};
