//! imgboard Storage - Versioned Cache-Aside Layer
//!
//! Sits between data-access callers, the relational store ([`SourceOfTruth`])
//! and a key-value store ([`KvStore`]). Reads are served from the cache when
//! the entry's version is current and fall back to the source of truth
//! otherwise; inserts invalidate by bumping per-namespace change counters.

pub mod cache;
pub mod read_through;
pub mod source;
pub mod telemetry;

pub use cache::{
    CacheLookup, CacheStats, CacheableEntity, CodecError, EntityCache, InMemoryKvStore,
    KeyLayout, KvStore, MissReason, Namespace, Populator, RedisKvStore, StatsRecorder, TaskKind,
    VersionedCache, VersionedContainer, VersionedStoreClient, COUNTER_SUFFIX,
};
pub use read_through::CachedRepository;
pub use source::{MemorySource, SourceOfTruth};
pub use telemetry::{init_tracing, TelemetryConfig, TelemetryError};
