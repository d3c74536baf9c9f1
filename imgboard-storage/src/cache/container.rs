//! Versioned container codec.
//!
//! An entry's stored value pairs the serialized payload with the counter
//! value observed by the writer:
//!
//! ```text
//! {"Version":3,"Content":"[{\"key\":\"a\",\"name\":\"Anime\"}]"}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for container encoding and decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode container: {0}")]
    Encode(String),

    #[error("Malformed container: {0}")]
    Malformed(String),
}

/// Payload stamped with the change counter observed at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedContainer {
    #[serde(rename = "Version")]
    pub version: i64,
    /// Serialized entity or entity list; opaque to the codec.
    #[serde(rename = "Content")]
    pub content: String,
}

impl VersionedContainer {
    pub fn new(version: i64, content: impl Into<String>) -> Self {
        Self {
            version,
            content: content.into(),
        }
    }

    /// Encode to the stored byte representation.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode stored bytes. Callers treat any error as a cache miss.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    /// True when the namespace counter has moved past this entry's stamp.
    pub fn is_stale(&self, counter: i64) -> bool {
        counter > self.version
    }
}
