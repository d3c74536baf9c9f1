//! Configuration types

use crate::{ConfigError, ImgboardResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REDIS_ADDRESS: &str = "localhost:6379";
pub const DEFAULT_KEY_PREFIX: &str = "imgboard";
pub const DEFAULT_POPULATE_CONCURRENCY: usize = 32;

/// Parse a boolean flag from an environment value.
///
/// Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`, ignoring case and
/// surrounding whitespace. Anything else is `None` so callers keep their default.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Connection parameters for the networked key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// `host:port`
    pub address: String,
    pub password: Option<String>,
    /// Logical database index.
    pub database: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_REDIS_ADDRESS.to_string(),
            password: None,
            database: 0,
        }
    }
}

impl RedisConfig {
    /// Create RedisConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `IMGBOARD_REDIS_ADDRESS`: `host:port` (default: localhost:6379)
    /// - `IMGBOARD_REDIS_PASSWORD`: password, unset or empty for none
    /// - `IMGBOARD_REDIS_DATABASE`: logical database index (default: 0)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`RedisConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            address: lookup("IMGBOARD_REDIS_ADDRESS").unwrap_or(defaults.address),
            password: lookup("IMGBOARD_REDIS_PASSWORD").filter(|p| !p.is_empty()),
            database: lookup("IMGBOARD_REDIS_DATABASE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.database),
        }
    }

    /// Build the `redis://` connection URL.
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}/{}", password, self.address, self.database),
            None => format!("redis://{}/{}", self.address, self.database),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ImgboardResult<()> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "address".to_string(),
            }
            .into());
        }

        if self.database < 0 {
            return Err(ConfigError::InvalidValue {
                field: "database".to_string(),
                value: self.database.to_string(),
                reason: "database index must be non-negative".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Configuration for the cache layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Application prefix of every cache and counter key.
    pub key_prefix: String,
    /// Maximum number of background populations running at once.
    pub populate_concurrency: usize,
    /// When false, reads and writes go straight to the source of truth.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            populate_concurrency: DEFAULT_POPULATE_CONCURRENCY,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `IMGBOARD_CACHE_PREFIX`: key prefix (default: imgboard)
    /// - `IMGBOARD_CACHE_POPULATE_CONCURRENCY`: background population limit (default: 32)
    /// - `IMGBOARD_CACHE_ENABLED`: `false`/`0`/`no`/`off` bypasses the cache (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            key_prefix: lookup("IMGBOARD_CACHE_PREFIX").unwrap_or(defaults.key_prefix),
            populate_concurrency: lookup("IMGBOARD_CACHE_POPULATE_CONCURRENCY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.populate_concurrency),
            enabled: lookup("IMGBOARD_CACHE_ENABLED")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.enabled),
        }
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the background population limit.
    pub fn with_populate_concurrency(mut self, limit: usize) -> Self {
        self.populate_concurrency = limit;
        self
    }

    /// Enable or disable the cache.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - key_prefix is non-empty and contains no `:` (it is a single key segment)
    /// - populate_concurrency > 0
    pub fn validate(&self) -> ImgboardResult<()> {
        if self.key_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "key_prefix".to_string(),
                value: self.key_prefix.clone(),
                reason: "key_prefix must not be empty".to_string(),
            }
            .into());
        }

        if self.key_prefix.contains(':') {
            return Err(ConfigError::InvalidValue {
                field: "key_prefix".to_string(),
                value: self.key_prefix.clone(),
                reason: "key_prefix must not contain ':'".to_string(),
            }
            .into());
        }

        if self.populate_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "populate_concurrency".to_string(),
                value: self.populate_concurrency.to_string(),
                reason: "populate_concurrency must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
