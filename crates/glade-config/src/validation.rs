//! Configuration validation module.
//!
//! Collects every problem in one pass so a misconfigured deployment fails
//! fast with the full list instead of one error per restart.

use crate::Settings;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size must be at least one connection.
    EmptyPool,
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: usize, maximum: usize },
    /// Timeout or TTL value must be positive.
    NonPositiveDuration { name: String },
    /// Cache capacity must be at least one entry.
    ZeroCapacity,
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::EmptyPool => write!(f, "Redis pool size must be at least 1"),
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(
                    f,
                    "Pool size {} exceeds maximum allowed ({})",
                    value, maximum
                )
            }
            Self::NonPositiveDuration { name } => {
                write!(f, "'{}' must be positive", name)
            }
            Self::ZeroCapacity => {
                write!(f, "defaults.max must be at least 1")
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: pretty, json)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(settings: &Settings) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::default();

        Self::validate_redis(&settings.redis, &mut result);
        Self::validate_cache(settings, &mut result);
        Self::validate_observability(&settings.observability, &mut result);

        result.into_result()
    }

    fn validate_redis(config: &crate::RedisConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        match Url::parse(&config.url) {
            Ok(url) if matches!(url.scheme(), "redis" | "rediss" | "redis+unix") => {}
            Ok(url) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            }),
        }

        if config.pool_size == 0 {
            result.add_error(ConfigValidationError::EmptyPool);
        } else if config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "redis.connect_timeout_secs".to_string(),
            });
        }
    }

    fn validate_cache(settings: &Settings, result: &mut ValidationResult) {
        if settings.defaults.max == 0 {
            result.add_error(ConfigValidationError::ZeroCapacity);
        }

        if settings.defaults.max_age_ms == Some(0) {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "defaults.max_age_ms".to_string(),
            });
        }

        if settings.cache.default_ttl_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "cache.default_ttl_secs".to_string(),
            });
        }
    }

    fn validate_observability(config: &glade_core::TelemetryConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        let format = config.log_format.to_lowercase();
        if !Self::VALID_LOG_FORMATS.contains(&format.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
