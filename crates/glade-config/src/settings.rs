//! Configuration structures.

use glade_core::{Strategy, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Backing store connection.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Process-wide cache switches.
    #[serde(default)]
    pub cache: CachePolicyConfig,

    /// Defaults applied to controller caches.
    #[serde(default)]
    pub defaults: CacheDefaultsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: TelemetryConfig,
}

impl Settings {
    /// Returns true if caching should be switched off for this process.
    ///
    /// Development environments run without a cache unless
    /// `cache.enable_in_development` is set; `cache.disable` always wins.
    #[must_use]
    pub fn is_cache_disabled(&self) -> bool {
        self.cache.disable || (self.app.is_development() && !self.cache.enable_in_development)
    }
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "glade".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl AppMetadata {
    /// Returns true for the development environment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Use Redis; when false an in-process store is used instead.
    pub enabled: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            connect_timeout_secs: 5,
            enabled: true,
        }
    }
}

impl RedisConfig {
    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Process-wide cache switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicyConfig {
    /// Disable caching everywhere.
    pub disable: bool,
    /// Keep caching on in the development environment.
    pub enable_in_development: bool,
    /// TTL for the general purpose cache, in seconds.
    pub default_ttl_secs: u64,
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            disable: false,
            enable_in_development: false,
            default_ttl_secs: 86_400, // 24 hours
        }
    }
}

impl CachePolicyConfig {
    /// Returns the general purpose TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Defaults for controller caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDefaultsConfig {
    /// Maximum number of entries per namespace.
    pub max: usize,
    /// Scoring strategy.
    pub strategy: Strategy,
    /// Namespace-wide TTL in milliseconds.
    pub max_age_ms: Option<u64>,
}

impl Default for CacheDefaultsConfig {
    fn default() -> Self {
        Self {
            max: 3,
            strategy: Strategy::Recency,
            max_age_ms: None,
        }
    }
}

impl CacheDefaultsConfig {
    /// Returns the namespace-wide TTL, if any.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_ms.map(Duration::from_millis)
    }
}
