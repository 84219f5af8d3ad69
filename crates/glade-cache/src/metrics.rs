//! Metrics for cache effectiveness and store latency.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding application. Namespaces are never used as labels since they
//! embed entity ids and would explode cardinality.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names for the cache layer.
pub mod names {
    /// Reads that found a value.
    pub const CACHE_HITS_TOTAL: &str = "glade_cache_hits_total";
    /// Reads that found nothing.
    pub const CACHE_MISSES_TOTAL: &str = "glade_cache_misses_total";
    /// Values written.
    pub const CACHE_WRITES_TOTAL: &str = "glade_cache_writes_total";
    /// Writes skipped because caching is disabled or the value is blank.
    pub const CACHE_SKIPPED_WRITES_TOTAL: &str = "glade_cache_skipped_writes_total";
    /// Entries evicted to enforce capacity.
    pub const CACHE_EVICTIONS_TOTAL: &str = "glade_cache_evictions_total";
    /// Index members removed because their value had expired.
    pub const CACHE_STALE_SWEEPS_TOTAL: &str = "glade_cache_stale_sweeps_total";

    /// Store round-trip duration in seconds.
    pub const STORE_OPERATION_DURATION: &str = "glade_store_operation_duration_seconds";
    /// Redis connection pool size.
    pub const REDIS_POOL_SIZE: &str = "glade_redis_pool_size";
    /// Redis connections currently available.
    pub const REDIS_POOL_AVAILABLE: &str = "glade_redis_pool_available";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(names::CACHE_WRITES_TOTAL, "Total number of values written to the cache");
    describe_counter!(
        names::CACHE_SKIPPED_WRITES_TOTAL,
        "Total number of writes skipped (cache disabled or blank value)"
    );
    describe_counter!(
        names::CACHE_EVICTIONS_TOTAL,
        "Total number of entries evicted to enforce capacity"
    );
    describe_counter!(
        names::CACHE_STALE_SWEEPS_TOTAL,
        "Total number of expired entries removed from an index on access"
    );

    describe_histogram!(
        names::STORE_OPERATION_DURATION,
        "Backing store round-trip duration in seconds"
    );
    describe_gauge!(names::REDIS_POOL_SIZE, "Redis connection pool size");
    describe_gauge!(
        names::REDIS_POOL_AVAILABLE,
        "Available connections in Redis pool"
    );
}

/// Why a write did not reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Caching is switched off process-wide.
    Disabled,
    /// The value was null or otherwise blank.
    Blank,
}

impl SkipReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Blank => "blank",
        }
    }
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a read that found a value.
    pub fn hit() {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    }

    /// Record a read that found nothing.
    pub fn miss() {
        counter!(names::CACHE_MISSES_TOTAL).increment(1);
    }

    /// Record a value written.
    pub fn write() {
        counter!(names::CACHE_WRITES_TOTAL).increment(1);
    }

    /// Record a skipped write.
    pub fn write_skipped(reason: SkipReason) {
        counter!(
            names::CACHE_SKIPPED_WRITES_TOTAL,
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    /// Record evicted entries.
    pub fn evicted(count: usize) {
        counter!(names::CACHE_EVICTIONS_TOTAL).increment(count as u64);
    }

    /// Record a stale index member swept on access.
    pub fn stale_swept() {
        counter!(names::CACHE_STALE_SWEEPS_TOTAL).increment(1);
    }

    /// Record a store round-trip.
    pub fn store_operation(backend: &'static str, operation: &'static str, duration: Duration) {
        histogram!(
            names::STORE_OPERATION_DURATION,
            "backend" => backend,
            "operation" => operation
        )
        .record(duration.as_secs_f64());
    }

    /// Update pool status.
    pub fn update_pool_status(pool_size: usize, available: usize) {
        gauge!(names::REDIS_POOL_SIZE).set(pool_size as f64);
        gauge!(names::REDIS_POOL_AVAILABLE).set(available as f64);
    }
}
