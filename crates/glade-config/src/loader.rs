//! Configuration loader with layered sources.

use crate::{format_validation_errors, ConfigValidator, Settings};
use config::{Config, ConfigError, Environment, File};
use glade_core::CacheError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    settings: Arc<RwLock<Settings>>,
    config_dir: String,
    environment: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{dir}/default.toml` - Default values
    /// 2. `{dir}/{environment}.toml` - Environment-specific overrides
    /// 3. `{dir}/local.toml` - Local overrides
    /// 4. Environment variables with `GLADE_` prefix (`GLADE_REDIS__URL`)
    ///
    /// The environment name comes from `GLADE_ENVIRONMENT` and defaults to
    /// `development`.
    pub fn new(config_dir: impl Into<String>) -> Result<Self, CacheError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var("GLADE_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        Self::with_environment(config_dir, environment)
    }

    /// Creates a loader for an explicit environment name.
    pub fn with_environment(
        config_dir: impl Into<String>,
        environment: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let config_dir = config_dir.into();
        let environment = environment.into();
        let settings = Self::load_settings(&config_dir, &environment)?;

        Ok(Self {
            settings: Arc::new(RwLock::new(settings)),
            config_dir,
            environment,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, CacheError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous settings stay in place if the new ones fail to load or
    /// validate.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let fresh = Self::load_settings(&self.config_dir, &self.environment)?;
        let mut settings = self.settings.write().await;
        *settings = fresh;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Gets a specific configuration value by dotted key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let settings = self.settings.read().await;
        let json = serde_json::to_value(&*settings).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }

    fn load_settings(config_dir: &str, environment: &str) -> Result<Settings, CacheError> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder()
            .set_default("app.environment", environment)
            .map_err(config_error)?;

        for name in ["default", environment, "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("GLADE")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error)?;

        ConfigValidator::validate(&settings)
            .map_err(|errors| CacheError::InvalidConfiguration(format_validation_errors(&errors)))?;

        Ok(settings)
    }
}

fn config_error(err: ConfigError) -> CacheError {
    CacheError::InvalidConfiguration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glade_core::Strategy;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    fn dir_str(dir: &TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_empty_directory_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_environment(dir_str(&dir), "staging").unwrap();

        let settings = loader.get().await;
        assert_eq!(settings.app.environment, "staging");
        assert_eq!(settings.defaults.max, 3);
    }

    #[tokio::test]
    async fn test_layered_files() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            "[defaults]\nmax = 10\nstrategy = \"LFU\"\n\n[redis]\npool_size = 4\n",
        );
        write(&dir, "production.toml", "[defaults]\nmax = 50\n");

        let loader = ConfigLoader::with_environment(dir_str(&dir), "production").unwrap();
        let settings = loader.get().await;

        assert_eq!(settings.defaults.max, 50);
        assert_eq!(settings.defaults.strategy, Strategy::Frequency);
        assert_eq!(settings.redis.pool_size, 4);
        assert!(!settings.is_cache_disabled());
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[defaults]\nmax = 0\n");

        let err = ConfigLoader::with_environment(dir_str(&dir), "test").err().unwrap();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
        assert!(err.to_string().contains("defaults.max"));
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[cache]\ndefault_ttl_secs = 60\n");

        let loader = ConfigLoader::with_environment(dir_str(&dir), "test").unwrap();
        assert_eq!(loader.get().await.cache.default_ttl_secs, 60);

        write(&dir, "default.toml", "[cache]\ndefault_ttl_secs = 120\n");
        loader.reload().await.unwrap();
        assert_eq!(loader.get().await.cache.default_ttl_secs, 120);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[defaults]\nmax = 5\n");

        let loader = ConfigLoader::with_environment(dir_str(&dir), "test").unwrap();
        write(&dir, "default.toml", "[defaults]\nmax = 0\n");

        assert!(loader.reload().await.is_err());
        assert_eq!(loader.get().await.defaults.max, 5);
    }

    #[tokio::test]
    async fn test_get_value_by_path() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[redis]\nurl = \"redis://cache:6380\"\n");

        let loader = ConfigLoader::with_environment(dir_str(&dir), "test").unwrap();
        let url: Option<String> = loader.get_value("redis.url").await;
        assert_eq!(url.as_deref(), Some("redis://cache:6380"));

        let missing: Option<String> = loader.get_value("redis.nope").await;
        assert!(missing.is_none());
    }
}
