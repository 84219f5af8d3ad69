//! Glade Cache - Namespaced LRU/LFU caching over a shared store
//!
//! A cache layer where all state lives in a shared key-value and sorted-set
//! store (Redis), so any number of processes can use the same caches:
//! - Per-namespace capacity enforced by score-based eviction
//! - Recency (LRU), frequency (LFU) or custom scoring
//! - Per-key and per-namespace TTL with lazy index cleanup
//! - Atomic read-with-touch and write-with-evict transactions
//! - Controller/action naming layer with a get-or-compute `resolve` idiom
//! - Process-wide general purpose cache
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  Request handlers                                          │
//! │     │                                                      │
//! │     ▼                                                      │
//! │  ActionCache ──► ControllerCache      CacheService         │
//! │                    │  Resource:Operation:[sub]:[id]:   │   │
//! │                    ▼                                   │   │
//! │                 LruCache                               │   │
//! │                    │  {ns}{key} values + {ns}-i index  │   │
//! │                    ▼                                   ▼   │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │ CacheStore (MULTI/EXEC transactions)                │   │
//! │  │   RedisStore (deadpool-redis)   MemoryStore         │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use glade_cache::{ActionCache, CacheBackend, CacheOptions};
//! use glade_core::{CacheError, Strategy};
//!
//! let backend = CacheBackend::from_settings(&settings).await?;
//! let widgets = ActionCache::new(&backend, "Widgets");
//!
//! let widget: Option<Widget> = widgets
//!     .resolve(
//!         "FindOne",
//!         "/widgets/12",
//!         CacheOptions::new().max(100).strategy(Strategy::Frequency),
//!         || async { repo.find(12).await.map_err(CacheError::compute) },
//!     )
//!     .await?;
//!
//! // After an update, drop the stale entry
//! widgets.action("FindOne", CacheOptions::new())?.cache().del("/widgets/12").await?;
//! ```

pub mod backend;
pub mod codec;
pub mod controller;
pub mod di;
pub mod lru;
pub mod metrics;
pub mod namespace;
pub mod options;
pub mod service;
pub mod store;

pub use backend::{CacheBackend, CachePolicy};
pub use codec::Binary;
pub use controller::{ActionCache, CacheOptions, ControllerCache, DEFAULT_MAX};
pub use di::{build_cache_module, build_cache_module_with, CacheModule, CacheProvider, CacheResolver};
pub use glade_core::{CacheError, CacheResult, Strategy};
pub use lru::{eviction_candidates, LruCache};
pub use metrics::{register_metrics, CacheMetrics};
pub use namespace::{Namespace, DEFAULT_NAMESPACE, UNDEFINED_OPERATION, UNDEFINED_RESOURCE};
pub use options::{LruOptions, ScoreFn, Scoring};
pub use service::{CacheService, DEFAULT_TTL};
pub use store::{CacheStore, CacheStoreExt, MemoryStore, RedisStore};
