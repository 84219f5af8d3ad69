//! Dependency injection wiring using Shaku.
//!
//! `CacheModule` holds one shared [`CacheBackend`] together with the
//! settings it was built from, and hands out the cache types request
//! handlers need.

use crate::backend::CacheBackend;
use crate::controller::{ActionCache, CacheOptions};
use crate::service::CacheService;
use glade_config::Settings;
use glade_core::{CacheResult, Interface};
use shaku::{module, Component, HasComponent};
use std::sync::Arc;
use tracing::info;

/// Source of caches bound to the process-wide backend.
pub trait CacheProvider: Interface {
    /// Returns the shared backend.
    fn backend(&self) -> CacheBackend;

    /// Returns the general purpose cache with the configured TTL.
    fn service(&self) -> CacheService;

    /// Returns the action cache factory of a resource, with the
    /// configured controller defaults.
    fn actions(&self, resource: &str) -> ActionCache;
}

/// Shaku component backing [`CacheProvider`].
#[derive(Component)]
#[shaku(interface = CacheProvider)]
pub struct CacheComponents {
    backend: CacheBackend,
    settings: Settings,
}

impl CacheProvider for CacheComponents {
    fn backend(&self) -> CacheBackend {
        self.backend.clone()
    }

    fn service(&self) -> CacheService {
        CacheService::from_settings(&self.backend, &self.settings)
    }

    fn actions(&self, resource: &str) -> ActionCache {
        ActionCache::new(&self.backend, resource)
            .with_defaults(CacheOptions::from(&self.settings.defaults))
    }
}

module! {
    pub CacheModule {
        components = [CacheComponents],
        providers = [],
    }
}

/// Builds the cache module from configuration.
///
/// Connects to Redis when `redis.enabled`, otherwise uses an in-memory
/// store.
pub async fn build_cache_module(settings: &Settings) -> CacheResult<Arc<CacheModule>> {
    let backend = CacheBackend::from_settings(settings).await?;
    Ok(build_cache_module_with(backend, settings.clone()))
}

/// Builds the cache module around an existing backend.
#[must_use]
pub fn build_cache_module_with(backend: CacheBackend, settings: Settings) -> Arc<CacheModule> {
    info!(
        store = backend.store().backend(),
        disabled = backend.is_disabled(),
        "Building cache module"
    );

    let module = CacheModule::builder()
        .with_component_parameters::<CacheComponents>(CacheComponentsParameters { backend, settings })
        .build();

    Arc::new(module)
}

/// Resolves the cache provider from a module.
pub trait CacheResolver {
    /// Resolves the cache provider.
    fn cache_provider(&self) -> Arc<dyn CacheProvider>;
}

impl CacheResolver for CacheModule {
    fn cache_provider(&self) -> Arc<dyn CacheProvider> {
        self.resolve()
    }
}
