//! Cache metrics counters and snapshots.
//!
//! Counters are plain relaxed atomics recorded on the orchestrator's hot
//! path; [`MetricsSnapshot`] adds point-in-time gauges (entry count, forced
//! takeovers) when captured through
//! [`MemoCache::metrics`](crate::cache::sync::MemoCache::metrics) or
//! [`AsyncMemoCache::metrics`](crate::cache::task::AsyncMemoCache::metrics).
//!
//! Forced-takeover visibility is deliberate: the timeout-means-takeover
//! trade-off in the lock registry is easy to misread as "timeout means
//! fail", so the count is always available rather than feature-gated.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by one cache instance.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    computes: AtomicU64,
    compute_failures: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment hit counter.
    #[inline]
    pub(crate) fn record_hit(&self) {
        self.get_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment miss counter.
    #[inline]
    pub(crate) fn record_miss(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment compute counter.
    #[inline]
    pub(crate) fn record_compute(&self) {
        self.computes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment compute-failure counter.
    #[inline]
    pub(crate) fn record_compute_failure(&self) {
        self.compute_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture the counters, folding in the gauges supplied by the cache.
    pub(crate) fn snapshot(&self, lock_takeovers: u64, cache_len: usize, max_size: Option<usize>) -> MetricsSnapshot {
        MetricsSnapshot {
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
            lock_takeovers,
            cache_len,
            max_size,
        }
    }
}

/// Point-in-time view of one cache instance's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,

    /// Compute callbacks invoked (misses that reached the callback).
    pub computes: u64,
    /// Compute callbacks that returned an error (nothing was stored).
    pub compute_failures: u64,

    /// Forced lock takeovers after wait timeouts.
    pub lock_takeovers: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub max_size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_compute();
        metrics.record_compute_failure();

        let snap = metrics.snapshot(3, 7, Some(64));
        assert_eq!(snap.get_hits, 2);
        assert_eq!(snap.get_misses, 1);
        assert_eq!(snap.computes, 1);
        assert_eq!(snap.compute_failures, 1);
        assert_eq!(snap.lock_takeovers, 3);
        assert_eq!(snap.cache_len, 7);
        assert_eq!(snap.max_size, Some(64));
    }

    #[test]
    fn snapshot_is_plain_data() {
        let snap = MetricsSnapshot::default();
        let copy = snap;
        assert_eq!(snap, copy);
    }
}
