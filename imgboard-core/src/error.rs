//! Error types for imgboard operations

use crate::EntityType;
use thiserror::Error;

/// Source-of-truth (relational store) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entity not found: {entity_type} with key {key}")]
    NotFound { entity_type: EntityType, key: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Insert failed for {entity_type}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },
}

impl StoreError {
    pub fn not_found(entity_type: EntityType, key: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            key: key.to_string(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Key-value cache errors.
///
/// None of these ever reach a caller of the read-through layer; they are
/// logged and the layer degrades to pass-through.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Change counter {key} cannot be incremented: {value}")]
    CorruptCounter { key: String, value: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl CacheError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all imgboard errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImgboardError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ImgboardError {
    /// The entity is genuinely absent from the source of truth.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound { .. }))
    }

    /// A transport failure that callers should report as "temporarily unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Unavailable { .. }) | Self::Cache(CacheError::Unavailable { .. })
        )
    }
}

/// Result type alias for imgboard operations.
pub type ImgboardResult<T> = Result<T, ImgboardError>;

/// Result type alias for source-of-truth operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for key-value cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_not_found() {
        let err = StoreError::not_found(EntityType::Thread, 42);
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Thread"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_cache_error_display_corrupt_counter() {
        let err = CacheError::CorruptCounter {
            key: "imgboard:thread-by-key:last-change".to_string(),
            value: "abc".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("last-change"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "key_prefix".to_string(),
            value: "".to_string(),
            reason: "must not be empty".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("key_prefix"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_imgboard_error_from_variants() {
        let store: ImgboardError = StoreError::unavailable("connection refused").into();
        assert!(matches!(store, ImgboardError::Store(_)));
        assert!(store.is_unavailable());
        assert!(!store.is_not_found());

        let missing: ImgboardError = StoreError::not_found(EntityType::Board, "a").into();
        assert!(missing.is_not_found());

        let cache: ImgboardError = CacheError::unavailable("timeout").into();
        assert!(matches!(cache, ImgboardError::Cache(_)));

        let config: ImgboardError = ConfigError::MissingRequired {
            field: "address".to_string(),
        }
        .into();
        assert!(matches!(config, ImgboardError::Config(_)));
    }
}
