//! Shared store handle and process-wide cache policy.

use crate::store::{CacheStore, MemoryStore, RedisStore};
use glade_config::Settings;
use glade_core::CacheResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Process-wide cache switch.
///
/// When disabled, writes become no-ops returning `false` and nothing is
/// stored, so reads miss. Shared by every cache built from the same
/// [`CacheBackend`].
#[derive(Debug, Default)]
pub struct CachePolicy {
    disabled: AtomicBool,
}

impl CachePolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(disabled: bool) -> Self {
        Self {
            disabled: AtomicBool::new(disabled),
        }
    }

    /// Caching on.
    #[must_use]
    pub fn enabled() -> Self {
        Self::new(false)
    }

    /// Caching off.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(true)
    }

    /// Derives the switch from configuration.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.is_cache_disabled())
    }

    /// Returns true if caching is off.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    /// Flips the switch at runtime.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
        info!(disabled, "Cache policy updated");
    }
}

/// A store handle plus the policy every cache built on it obeys.
///
/// Cloning is cheap; all clones share the same store and policy.
#[derive(Clone)]
pub struct CacheBackend {
    store: Arc<dyn CacheStore>,
    policy: Arc<CachePolicy>,
}

impl CacheBackend {
    /// Creates a backend from its parts.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, policy: Arc<CachePolicy>) -> Self {
        Self { store, policy }
    }

    /// An enabled backend over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(CachePolicy::enabled()))
    }

    /// Builds the backend described by configuration: Redis when
    /// `redis.enabled`, otherwise an in-memory store.
    pub async fn from_settings(settings: &Settings) -> CacheResult<Self> {
        let policy = Arc::new(CachePolicy::from_settings(settings));
        if policy.is_disabled() {
            warn!(
                environment = %settings.app.environment,
                "Caching is disabled; writes will be skipped"
            );
        }

        let store: Arc<dyn CacheStore> = if settings.redis.enabled {
            Arc::new(RedisStore::connect(&settings.redis).await?)
        } else {
            info!("Redis disabled, using in-memory cache store");
            Arc::new(MemoryStore::new())
        };

        Ok(Self::new(store, policy))
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the policy.
    #[must_use]
    pub fn policy(&self) -> &Arc<CachePolicy> {
        &self.policy
    }

    /// Returns true if caching is off.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.policy.is_disabled()
    }
}

impl Default for CacheBackend {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBackend")
            .field("store", &self.store.backend())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_toggle() {
        let policy = CachePolicy::enabled();
        assert!(!policy.is_disabled());

        policy.set_disabled(true);
        assert!(policy.is_disabled());
    }

    #[test]
    fn test_policy_from_settings() {
        let mut settings = Settings::default();
        assert!(CachePolicy::from_settings(&settings).is_disabled());

        settings.app.environment = "production".to_string();
        assert!(!CachePolicy::from_settings(&settings).is_disabled());
    }

    #[tokio::test]
    async fn test_from_settings_without_redis() {
        let mut settings = Settings::default();
        settings.redis.enabled = false;
        settings.cache.enable_in_development = true;

        let backend = CacheBackend::from_settings(&settings).await.unwrap();
        assert_eq!(backend.store().backend(), "memory");
        assert!(!backend.is_disabled());
    }

    #[test]
    fn test_clones_share_policy() {
        let backend = CacheBackend::in_memory();
        let clone = backend.clone();

        backend.policy().set_disabled(true);
        assert!(clone.is_disabled());
        assert!(format!("{backend:?}").contains("memory"));
    }
}
