//! General purpose cache over raw store keys.
//!
//! Unlike controller caches there is no namespace, index or capacity here:
//! values are stored under the caller's key with a TTL (24 hours unless
//! configured otherwise). Useful for caching things that live outside
//! request handlers.

use crate::backend::{CacheBackend, CachePolicy};
use crate::codec;
use crate::metrics::{CacheMetrics, SkipReason};
use crate::store::{CacheStore, CacheStoreExt};
use glade_config::Settings;
use glade_core::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default TTL for stored items (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Process-wide key-value cache.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
    policy: Arc<CachePolicy>,
    default_ttl: Duration,
}

impl CacheService {
    /// Creates a service with the default TTL.
    #[must_use]
    pub fn new(backend: &CacheBackend) -> Self {
        Self::with_ttl(backend, DEFAULT_TTL)
    }

    /// Creates a service with a custom default TTL.
    #[must_use]
    pub fn with_ttl(backend: &CacheBackend, default_ttl: Duration) -> Self {
        Self {
            store: Arc::clone(backend.store()),
            policy: Arc::clone(backend.policy()),
            default_ttl,
        }
    }

    /// Creates a service using the configured default TTL.
    #[must_use]
    pub fn from_settings(backend: &CacheBackend, settings: &Settings) -> Self {
        Self::with_ttl(backend, settings.cache.default_ttl())
    }

    /// Returns true if caching is off.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.policy.is_disabled()
    }

    /// Gets a value.
    ///
    /// Text that is not valid JSON for `T` is retried as a plain string, so
    /// values written raw by other clients can still be read as `String`.
    pub async fn get<T: DeserializeOwned>(&self, name: &str) -> CacheResult<Option<T>> {
        let text = match self.store.get(name).await? {
            Some(text) if !text.is_empty() => text,
            _ => {
                debug!(key = name, "Cache miss");
                CacheMetrics::miss();
                return Ok(None);
            }
        };

        debug!(key = name, "Cache hit");
        CacheMetrics::hit();

        match codec::decode(&text) {
            Ok(value) => Ok(Some(value)),
            Err(err) => serde_json::from_value(Value::String(text)).map(Some).map_err(|_| err),
        }
    }

    /// Stores a value for `ttl`, or the default TTL.
    ///
    /// Returns `false` without writing when caching is disabled or the value
    /// is blank (null, false, zero or empty string).
    pub async fn store<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        if self.is_disabled() {
            CacheMetrics::write_skipped(SkipReason::Disabled);
            return Ok(false);
        }

        let json = codec::to_json(value)?;
        if codec::is_blank(&json) {
            CacheMetrics::write_skipped(SkipReason::Blank);
            return Ok(false);
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        self.store.set(name, &codec::encode(&json)?, Some(ttl)).await?;

        debug!(key = name, ttl_secs = ttl.as_secs(), "Cached value");
        CacheMetrics::write();
        Ok(true)
    }

    /// Returns the cached value, or computes and stores it.
    ///
    /// Returns `None`, storing nothing, when the computed value is blank.
    /// Errors from `compute` are returned unchanged.
    pub async fn resolve<T, E, F, Fut>(&self, name: &str, ttl: Option<Duration>, compute: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<Value>(name).await? {
            if !codec::is_blank(&cached) {
                return Ok(Some(serde_json::from_value(cached).map_err(CacheError::from)?));
            }
        }

        let value = compute().await?;
        if codec::is_blank(&codec::to_json(&value)?) {
            debug!(key = name, "Computed value is blank, not caching");
            return Ok(None);
        }

        self.store(name, &value, ttl).await?;
        Ok(Some(value))
    }

    /// Deletes one key, or flushes the whole store when `name` is `None`.
    ///
    /// Returns whether anything was removed for a single key; a flush
    /// always returns `true`.
    pub async fn clear(&self, name: Option<&str>) -> CacheResult<bool> {
        match name {
            Some(name) => {
                let removed = self.store.del(vec![name.to_string()]).await?;
                debug!(key = name, removed, "Cleared cache key");
                Ok(removed > 0)
            }
            None => {
                warn!(backend = self.store.backend(), "Flushing every cached key");
                self.store.flush().await?;
                Ok(true)
            }
        }
    }

    /// Lists keys matching a glob pattern (`*` when `None`).
    pub async fn list(&self, pattern: Option<&str>) -> CacheResult<Vec<String>> {
        self.store.keys(pattern.unwrap_or("*")).await
    }

    /// Deletes every key matching a glob pattern; returns how many were
    /// removed.
    ///
    /// Loads all matching key names into memory first.
    pub async fn clear_where(&self, pattern: &str) -> CacheResult<u64> {
        let keys = self.store.keys(pattern).await?;
        let removed = self.store.del(keys).await?;
        debug!(pattern, removed, "Cleared keys matching pattern");
        Ok(removed)
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("store", &self.store.backend())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
