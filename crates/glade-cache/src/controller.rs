//! Controller and action caches.
//!
//! The naming layer request handlers use: it derives a namespace from a
//! resource, an operation and optional sub-namespace and entity id, picks
//! scoring from a [`Strategy`], and wraps the result in an [`LruCache`].

use crate::backend::CacheBackend;
use crate::codec;
use crate::lru::LruCache;
use crate::namespace::{Namespace, UNDEFINED_OPERATION, UNDEFINED_RESOURCE};
use crate::options::{LruOptions, Scoring};
use glade_config::CacheDefaultsConfig;
use glade_core::{CacheError, CacheResult, Strategy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Capacity used when none is configured.
pub const DEFAULT_MAX: usize = 3;

/// Options for a controller cache. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Maximum number of entries.
    pub max: Option<usize>,
    /// Namespace-wide TTL.
    pub max_age: Option<Duration>,
    /// Scoring strategy.
    pub strategy: Option<Strategy>,
    /// Custom scoring; takes precedence over `strategy`.
    pub scoring: Option<Scoring>,
    /// Extra namespace segment, e.g. an API version.
    pub sub_namespace: Option<String>,
    /// Entity id segment, e.g. a document id.
    pub entity_id: Option<String>,
}

impl CacheOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity.
    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the TTL.
    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Sets the strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Sets custom scoring.
    #[must_use]
    pub fn scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = Some(scoring);
        self
    }

    /// Sets the sub-namespace.
    #[must_use]
    pub fn namespace(mut self, sub_namespace: impl Into<String>) -> Self {
        self.sub_namespace = Some(sub_namespace.into());
        self
    }

    /// Sets the entity id.
    #[must_use]
    pub fn entity(mut self, entity_id: impl ToString) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Fills unset capacity, TTL and scoring fields from `defaults`.
    #[must_use]
    pub fn with_fallback(self, defaults: &Self) -> Self {
        Self {
            max: self.max.or(defaults.max),
            max_age: self.max_age.or(defaults.max_age),
            strategy: self.strategy.or(defaults.strategy),
            scoring: self.scoring.or_else(|| defaults.scoring.clone()),
            ..self
        }
    }

    fn lru_options(&self, namespace: Namespace) -> LruOptions {
        let scoring = self
            .scoring
            .clone()
            .unwrap_or_else(|| Scoring::from_strategy(self.strategy.unwrap_or_default()));

        LruOptions {
            max: self.max.unwrap_or(DEFAULT_MAX),
            max_age: self.max_age,
            scoring,
            namespace,
        }
    }
}

impl From<&CacheDefaultsConfig> for CacheOptions {
    fn from(defaults: &CacheDefaultsConfig) -> Self {
        Self {
            max: Some(defaults.max),
            max_age: defaults.max_age(),
            strategy: Some(defaults.strategy),
            ..Self::default()
        }
    }
}

fn or_undefined(name: String, undefined: &str) -> String {
    if name.is_empty() {
        undefined.to_string()
    } else {
        name
    }
}

/// Cache scoped to one resource operation.
#[derive(Debug, Clone)]
pub struct ControllerCache {
    backend: CacheBackend,
    resource: String,
    operation: String,
    options: CacheOptions,
    cache: LruCache,
}

impl ControllerCache {
    /// Creates a cache for `resource` and `operation`. Empty names fall back
    /// to `UNDEFINED-CONTROLLER!` and `UNDEFINED-ACTION`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `options.max` is zero.
    pub fn new(
        backend: &CacheBackend,
        resource: impl Into<String>,
        operation: impl Into<String>,
        options: CacheOptions,
    ) -> CacheResult<Self> {
        let resource = or_undefined(resource.into(), UNDEFINED_RESOURCE);
        let operation = or_undefined(operation.into(), UNDEFINED_OPERATION);
        let namespace = Self::compose(&resource, &operation, &options);
        let cache = LruCache::new(backend, options.lru_options(namespace))?;

        debug!(namespace = %cache.namespace(), "Created controller cache");

        Ok(Self {
            backend: backend.clone(),
            resource,
            operation,
            options,
            cache,
        })
    }

    /// Creates a cache for a resource whose operation is unknown.
    pub fn for_resource(
        backend: &CacheBackend,
        resource: impl Into<String>,
        options: CacheOptions,
    ) -> CacheResult<Self> {
        Self::new(backend, resource, UNDEFINED_OPERATION, options)
    }

    fn compose(resource: &str, operation: &str, options: &CacheOptions) -> Namespace {
        Namespace::compose(
            resource,
            operation,
            options.sub_namespace.as_deref(),
            options.entity_id.as_deref(),
        )
    }

    /// Returns the namespace of the bound cache.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        self.cache.namespace()
    }

    /// Returns the resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the current options.
    #[must_use]
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Returns the bound cache.
    #[must_use]
    pub fn cache(&self) -> &LruCache {
        &self.cache
    }

    /// Replaces the options and rebinds the cache to the namespace and
    /// capacity they describe. Entries already stored under other
    /// namespaces are left alone.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `options.max` is zero; the current
    /// configuration is kept in that case.
    pub fn configure(&mut self, options: CacheOptions) -> CacheResult<()> {
        let namespace = Self::compose(&self.resource, &self.operation, &options);
        self.cache = LruCache::new(&self.backend, options.lru_options(namespace))?;
        self.options = options;

        debug!(namespace = %self.namespace(), "Reconfigured controller cache");
        Ok(())
    }

    /// Returns the cached value for a key; blank cached values count as a
    /// miss.
    pub async fn cached_version<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.cache.get::<Value>(key).await? {
            Some(value) if !codec::is_blank(&value) => Ok(Some(serde_json::from_value(value)?)),
            _ => Ok(None),
        }
    }

    /// Returns the cached value for `key`, or computes and stores it.
    ///
    /// Returns `None`, storing nothing, when the computed value is blank.
    /// Errors from `compute` are returned unchanged.
    pub async fn resolve<T, E, F, Fut>(&self, key: &str, compute: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.cached_version(key).await? {
            return Ok(Some(cached));
        }

        let value = compute().await?;
        if codec::is_blank(&codec::to_json(&value)?) {
            debug!(namespace = %self.namespace(), key, "Computed value is blank, not caching");
            return Ok(None);
        }

        self.cache.set(key, &value).await?;
        Ok(Some(value))
    }
}

/// Per-resource factory of controller caches.
///
/// Gives handlers access to the cache of any operation of their resource,
/// e.g. to drop an entry of `FindOne` after an update.
#[derive(Debug, Clone)]
pub struct ActionCache {
    backend: CacheBackend,
    resource: String,
    defaults: CacheOptions,
}

impl ActionCache {
    /// Creates a factory for a resource.
    pub fn new(backend: &CacheBackend, resource: impl Into<String>) -> Self {
        Self {
            backend: backend.clone(),
            resource: or_undefined(resource.into(), UNDEFINED_RESOURCE),
            defaults: CacheOptions::default(),
        }
    }

    /// Sets the defaults applied to every cache this factory builds.
    #[must_use]
    pub fn with_defaults(mut self, defaults: CacheOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Returns the resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the cache of one operation.
    pub fn action(&self, operation: &str, options: CacheOptions) -> CacheResult<ControllerCache> {
        ControllerCache::new(
            &self.backend,
            self.resource.clone(),
            operation,
            options.with_fallback(&self.defaults),
        )
    }

    /// Resolves `key` in the cache of `operation`; see
    /// [`ControllerCache::resolve`].
    pub async fn resolve<T, E, F, Fut>(
        &self,
        operation: &str,
        key: &str,
        options: CacheOptions,
        compute: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.action(operation, options)?.resolve(key, compute).await
    }
}
