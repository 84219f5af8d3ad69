//! Common test infrastructure for cache integration tests.

#![allow(dead_code)]

use glade_cache::{CacheBackend, CachePolicy, LruCache, LruOptions, MemoryStore, RedisStore, Scoring};
use glade_config::RedisConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// Enabled backend over a fresh in-memory store.
pub fn memory_backend() -> CacheBackend {
    CacheBackend::in_memory()
}

/// Backend whose policy has caching switched off.
pub fn disabled_backend() -> CacheBackend {
    CacheBackend::new(Arc::new(MemoryStore::new()), Arc::new(CachePolicy::disabled()))
}

/// Recency-like scoring from a counter instead of the clock, so that
/// consecutive accesses never tie within one millisecond.
pub fn sequence_scoring() -> Scoring {
    let counter = Arc::new(AtomicU64::new(0));
    Scoring::custom(move |_| (counter.fetch_add(1, Ordering::SeqCst) + 1) as f64, false)
}

/// LruCache with counter-based recency scoring.
pub fn lru(backend: &CacheBackend, namespace: &str, max: usize) -> LruCache {
    let options = LruOptions::new(max)
        .with_namespace(namespace)
        .with_scoring(sequence_scoring());
    LruCache::new(backend, options).expect("Failed to build cache")
}

/// LruCache with frequency scoring.
pub fn lfu(backend: &CacheBackend, namespace: &str, max: usize) -> LruCache {
    let options = LruOptions::new(max)
        .with_namespace(namespace)
        .with_scoring(Scoring::frequency());
    LruCache::new(backend, options).expect("Failed to build cache")
}

/// Sleeps past a TTL.
pub async fn tick(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Redis testcontainer wrapper.
///
/// Manages a Redis container lifecycle and provides a backend bound to it.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    backend: CacheBackend,
}

impl TestRedis {
    /// Starts a fresh Redis container and connects a pool to it.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = RedisConfig {
            url: format!("redis://127.0.0.1:{}", port),
            pool_size: 4,
            connect_timeout_secs: 5,
            enabled: true,
        };

        let store = Self::connect_with_retry(&config, 30).await;

        Self {
            _container: container,
            backend: CacheBackend::new(Arc::new(store), Arc::new(CachePolicy::enabled())),
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> CacheBackend {
        self.backend.clone()
    }

    async fn connect_with_retry(config: &RedisConfig, max_attempts: u32) -> RedisStore {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match RedisStore::connect(config).await {
                Ok(store) => return store,
                Err(e) => {
                    if attempts >= max_attempts {
                        panic!("Failed to connect to Redis after {} attempts: {}", max_attempts, e);
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}
