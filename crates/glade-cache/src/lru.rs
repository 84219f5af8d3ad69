//! Namespaced LRU/LFU cache over a shared store.
//!
//! Entries live under `{namespace}{key}`; their rank lives in a sorted-set
//! index at `{namespace}-i`. Lower index scores rank first, so eviction
//! always removes from the tail of the index.

use crate::backend::{CacheBackend, CachePolicy};
use crate::codec;
use crate::metrics::{CacheMetrics, SkipReason};
use crate::namespace::Namespace;
use crate::options::LruOptions;
use crate::store::{CacheStore, CacheStoreExt, Reply, Transaction};
use glade_core::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Picks the members to evict from the tail of the index.
///
/// `tail` holds the members ranked at `max - 1` and beyond, in rank order,
/// so its first member is the last one inside capacity. The key just
/// written is never evicted: when it sits in the tail it takes the place
/// that member would have kept.
#[must_use]
pub fn eviction_candidates(tail: Vec<String>, just_written: &str) -> Vec<String> {
    if tail.len() <= 1 {
        return Vec::new();
    }

    if tail.iter().any(|member| member == just_written) {
        tail.into_iter().filter(|member| member != just_written).collect()
    } else {
        tail.into_iter().skip(1).collect()
    }
}

/// Namespaced cache with bounded size.
///
/// Holds no state besides its configuration; building one per request is
/// fine.
#[derive(Clone)]
pub struct LruCache {
    store: Arc<dyn CacheStore>,
    policy: Arc<CachePolicy>,
    options: LruOptions,
    index_key: String,
}

impl LruCache {
    /// Creates a cache.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `options.max` is zero.
    pub fn new(backend: &CacheBackend, options: LruOptions) -> CacheResult<Self> {
        if options.max == 0 {
            return Err(CacheError::invalid_configuration(
                "max number of items in cache must be specified",
            ));
        }

        Ok(Self {
            store: Arc::clone(backend.store()),
            policy: Arc::clone(backend.policy()),
            index_key: options.namespace.index_key(),
            options,
        })
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.options.namespace
    }

    /// Returns the configuration.
    #[must_use]
    pub fn options(&self) -> &LruOptions {
        &self.options
    }

    fn qualify(&self, key: &str) -> String {
        self.options.namespace.qualify(key)
    }

    fn capacity_rank(&self) -> isize {
        isize::try_from(self.options.max - 1).unwrap_or(isize::MAX)
    }

    /// Gets a value and bumps its rank.
    ///
    /// The read and the rank update run in one transaction. A miss also
    /// drops the key from the index in case its value expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let qualified = self.qualify(key);
        let score = self.options.scoring.index_score(&qualified);

        let mut tx = Transaction::new();
        tx.get(&qualified);
        if self.options.scoring.is_increment() {
            tx.zadd_xx_incr(&self.index_key, &qualified, score);
        } else {
            tx.zadd_xx(&self.index_key, &qualified, score);
        }

        let value = first_reply(self.store.exec(tx).await?)?.into_value()?;
        self.found(&qualified, value).await
    }

    /// Gets a value without touching its rank.
    pub async fn peek<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let qualified = self.qualify(key);
        let value = self.store.get(&qualified).await?;
        self.found(&qualified, value).await
    }

    /// Returns true if a live value exists for the key.
    pub async fn has(&self, key: &str) -> CacheResult<bool> {
        let qualified = self.qualify(key);
        let exists = self.store.get(&qualified).await?.is_some();
        if !exists {
            self.sweep(&qualified).await?;
        }
        Ok(exists)
    }

    async fn found<T: DeserializeOwned>(&self, qualified: &str, value: Option<String>) -> CacheResult<Option<T>> {
        match value {
            Some(text) => {
                debug!(namespace = %self.namespace(), key = qualified, "Cache hit");
                CacheMetrics::hit();
                Ok(Some(codec::decode(&text)?))
            }
            None => {
                debug!(namespace = %self.namespace(), key = qualified, "Cache miss");
                CacheMetrics::miss();
                self.sweep(qualified).await?;
                Ok(None)
            }
        }
    }

    /// Drops an index member whose value is gone.
    async fn sweep(&self, qualified: &str) -> CacheResult<()> {
        let removed = self
            .store
            .zrem(&self.index_key, vec![qualified.to_string()])
            .await?;
        if removed > 0 {
            debug!(namespace = %self.namespace(), key = qualified, "Removed expired entry from index");
            CacheMetrics::stale_swept();
        }
        Ok(())
    }

    /// Stores a value with the namespace TTL.
    ///
    /// Returns `false` without writing when caching is disabled or the value
    /// serializes to `null`.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<bool> {
        self.write(key, value, self.options.max_age).await
    }

    /// Stores a value with its own TTL.
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<bool> {
        self.write(key, value, Some(ttl)).await
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<bool> {
        if self.policy.is_disabled() {
            CacheMetrics::write_skipped(SkipReason::Disabled);
            return Ok(false);
        }

        let text = codec::encode(value)?;
        if text == "null" {
            CacheMetrics::write_skipped(SkipReason::Blank);
            return Ok(false);
        }

        let qualified = self.qualify(key);
        let score = self.options.scoring.index_score(&qualified);

        let mut tx = Transaction::new();
        tx.set(&qualified, text, ttl);
        if self.options.scoring.is_increment() {
            tx.zincrby(&self.index_key, &qualified, score);
        } else {
            tx.zadd(&self.index_key, &qualified, score);
        }
        tx.zrange(&self.index_key, self.capacity_rank(), -1);

        let tail = self
            .store
            .exec(tx)
            .await?
            .into_iter()
            .nth(2)
            .ok_or_else(|| CacheError::unexpected_reply("missing ZRANGE reply"))?
            .into_members()?;

        let evicted = eviction_candidates(tail, &qualified);
        if !evicted.is_empty() {
            debug!(
                namespace = %self.namespace(),
                key = %qualified,
                evicted = ?evicted,
                "Evicting entries beyond capacity"
            );
            CacheMetrics::evicted(evicted.len());
            self.safe_delete(evicted).await?;
        }

        debug!(namespace = %self.namespace(), key = %qualified, ttl = ?ttl, "Cached value");
        CacheMetrics::write();
        Ok(true)
    }

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// Errors from `compute` are returned unchanged and nothing is stored.
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_set_inner(key, None, compute).await
    }

    /// Like [`get_or_set`](Self::get_or_set), storing with its own TTL.
    pub async fn get_or_set_with_ttl<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_set_inner(key, Some(ttl), compute).await
    }

    async fn get_or_set_inner<T, E, F, Fut>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await? {
            return Ok(cached);
        }

        let value = compute().await?;
        self.write(key, &value, ttl.or(self.options.max_age)).await?;
        Ok(value)
    }

    /// Removes a key and its index entry.
    pub async fn del(&self, key: &str) -> CacheResult<()> {
        self.safe_delete(vec![self.qualify(key)]).await
    }

    /// Removes every entry of the namespace.
    pub async fn reset(&self) -> CacheResult<()> {
        let members = self.store.zrange(&self.index_key, 0, -1).await?;
        debug!(namespace = %self.namespace(), count = members.len(), "Resetting cache");
        self.safe_delete(members).await
    }

    /// Removes keys from the index and the value store in one transaction.
    async fn safe_delete(&self, keys: Vec<String>) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut tx = Transaction::new();
        tx.zrem(&self.index_key, keys.clone()).del(keys);
        self.store.exec(tx).await?;
        Ok(())
    }

    /// Caller keys in rank order, best first.
    pub async fn keys(&self) -> CacheResult<Vec<String>> {
        let members = self.store.zrange(&self.index_key, 0, -1).await?;
        Ok(members
            .iter()
            .map(|member| self.namespace().strip(member).to_string())
            .collect())
    }

    /// Values of the top `max` ranked entries, in rank order.
    ///
    /// Entries whose value has expired are skipped.
    pub async fn values<T: DeserializeOwned>(&self) -> CacheResult<Vec<T>> {
        Ok(self
            .entries::<T>()
            .await?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Fully-qualified keys with their values for the top `max` ranked
    /// entries, in rank order.
    ///
    /// Entries whose value has expired are skipped.
    pub async fn entries<T: DeserializeOwned>(&self) -> CacheResult<Vec<(String, T)>> {
        let members = self.store.zrange(&self.index_key, 0, self.capacity_rank()).await?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let values = self.store.mget(members.clone()).await?;
        members
            .into_iter()
            .zip(values)
            .filter_map(|(member, value)| value.map(|text| (member, text)))
            .map(|(member, text)| codec::decode(&text).map(|value| (member, value)))
            .collect()
    }

    /// Number of index members.
    pub async fn count(&self) -> CacheResult<u64> {
        self.store.zcard(&self.index_key).await
    }
}

impl std::fmt::Debug for LruCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("namespace", &self.options.namespace)
            .field("max", &self.options.max)
            .field("max_age", &self.options.max_age)
            .finish_non_exhaustive()
    }
}

fn first_reply(replies: Vec<Reply>) -> CacheResult<Reply> {
    replies
        .into_iter()
        .next()
        .ok_or_else(|| CacheError::unexpected_reply("empty transaction reply"))
}
