//! Redis-backed key-value store.
//!
//! Uses the `redis` crate's tokio `ConnectionManager`, which multiplexes one
//! connection and reconnects on its own. Retry and backoff policy is left to
//! the manager; this module never retries.

use async_trait::async_trait;
use imgboard_core::{CacheError, CacheResult, RedisConfig};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ErrorKind, RedisError};

use super::traits::KvStore;

/// Networked key-value store over Redis (`GET`, `SET`, `INCR`).
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Open a managed connection using `config`.
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        config
            .validate()
            .map_err(|e| CacheError::unavailable(format!("invalid redis config: {}", e)))?;
        let client = redis::Client::open(config.connection_url().as_str())
            .map_err(|e| CacheError::unavailable(format!("invalid redis config: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::unavailable(e.to_string()))?;

        tracing::info!(address = %config.address, database = config.database, "Connected to redis");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

/// Classify a redis error from `INCR`.
///
/// Only a reply saying the stored value cannot be incremented means the
/// counter is bad. Other server refusals (OOM, READONLY, NOAUTH) and transport
/// failures mean the store is unavailable.
fn map_redis_error(key: &str, e: RedisError) -> CacheError {
    let message = e.to_string();
    let bad_counter = match e.kind() {
        ErrorKind::TypeError => true,
        ErrorKind::ResponseError => {
            message.contains("not an integer") || message.contains("would overflow")
        }
        _ => false,
    };

    if bad_counter {
        CacheError::CorruptCounter {
            key: key.to_string(),
            value: message,
        }
    } else {
        CacheError::unavailable(message)
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| CacheError::unavailable(e.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| CacheError::unavailable(e.to_string()))
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, i64>(key, 1_i64)
            .await
            .map_err(|e| map_redis_error(key, e))
    }
}
