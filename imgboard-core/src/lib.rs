//! imgboard Core - Entity Types
//!
//! Pure data structures shared by the cache layer and its consumers:
//! typed keys, domain records, the error taxonomy, and configuration.
//! This crate contains no I/O.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use config::{
    parse_bool, CacheConfig, RedisConfig, DEFAULT_KEY_PREFIX, DEFAULT_POPULATE_CONCURRENCY,
    DEFAULT_REDIS_ADDRESS,
};
pub use entities::{Author, Board, Image, NewPost, NewThread, Post, Thread};
pub use enums::EntityType;
pub use error::{
    CacheError, CacheResult, ConfigError, ImgboardError, ImgboardResult, StoreError, StoreResult,
};
pub use identity::{AuthorKey, BoardKey, ImageKey, PostKey, ThreadKey, Timestamp};
