//! Tracing initialization.
//!
//! Installs a `tracing` subscriber with an environment filter and either a
//! human readable or a JSON formatter.

#[cfg(feature = "telemetry")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::CacheResult;
use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether a subscriber should be installed at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Fallback filter when `RUST_LOG` is not set (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format (`pretty` or `json`).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl TelemetryConfig {
    /// Returns true when JSON output is requested.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this twice
/// returns an error instead of panicking.
#[cfg(feature = "telemetry")]
pub fn init_tracing(config: &TelemetryConfig) -> CacheResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},glade=debug", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    installed.map_err(|e| {
        crate::CacheError::invalid_configuration(format!("Failed to install tracing subscriber: {e}"))
    })?;

    tracing::info!(
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Tracing initialized"
    );

    Ok(())
}

/// Placeholder for when the telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_tracing(_config: &TelemetryConfig) -> CacheResult<()> {
    Ok(())
}
