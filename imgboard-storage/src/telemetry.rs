//! Tracing subscriber initialization.
//!
//! The library itself only emits `tracing` events. Binaries embedding the
//! cache call [`init_tracing`] once at startup to route them somewhere.

use imgboard_core::parse_bool;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "imgboard_storage=debug,info";

/// Error installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to init subscriber: {0}")]
    Init(String),
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
    /// Directive string used when `RUST_LOG` is absent or invalid.
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json: false,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Read `IMGBOARD_LOG_JSON` (`true`/`1`/`yes`/`on` enables JSON output).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            json: lookup("IMGBOARD_LOG_JSON")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(false),
            ..Self::default()
        }
    }
}

/// Install a global subscriber: env filter plus a JSON or pretty fmt layer.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json());
    let pretty_layer = (!config.json).then(|| tracing_subscriber::fmt::layer().pretty());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::info!(json = config.json, "Telemetry initialized");
    Ok(())
}
