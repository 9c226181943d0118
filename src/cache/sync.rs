//! Blocking cache orchestrator.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::lock::{KeyLockGuard, KeyLockRegistry, TakeoverHook};
use crate::metrics::{CacheMetrics, MetricsSnapshot};
use crate::store::ttl_map::ConcurrentTtlMap;
use crate::traits::Storage;

/// Single-flight memoization cache for blocking callers.
///
/// One instance serves one memoized function: it owns the expiring bounded
/// map holding that function's results and the per-key lock registry that
/// serializes concurrent computations of the same key. Construct through
/// [`CacheBuilder`](crate::builder::CacheBuilder) for validated
/// configuration.
///
/// # Example
///
/// ```
/// use memokit::builder::CacheBuilder;
///
/// let cache = CacheBuilder::new().try_build::<u64>().unwrap();
/// let value = cache.get_or_insert_with("answer", || 42);
/// assert_eq!(*value, 42);
///
/// // Second call is a hit; the closure does not run.
/// let again = cache.get_or_insert_with("answer", || unreachable!());
/// assert_eq!(*again, 42);
/// ```
pub struct MemoCache<V> {
    map: ConcurrentTtlMap<Arc<str>, V>,
    locks: KeyLockRegistry,
    lock_timeout: Option<Duration>,
    metrics: CacheMetrics,
}

impl<V> MemoCache<V> {
    /// Creates a cache with the given bounds and lock-wait timeout.
    ///
    /// Prefer [`CacheBuilder`](crate::builder::CacheBuilder), which also
    /// validates the parameters and can attach a takeover hook.
    pub fn new(
        max_size: Option<usize>,
        ttl: Option<Duration>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        Self::from_parts(max_size, ttl, lock_timeout, None)
    }

    pub(crate) fn from_parts(
        max_size: Option<usize>,
        ttl: Option<Duration>,
        lock_timeout: Option<Duration>,
        on_takeover: Option<TakeoverHook>,
    ) -> Self {
        let locks = match on_takeover {
            Some(hook) => KeyLockRegistry::with_takeover_hook(hook),
            None => KeyLockRegistry::new(),
        };
        Self {
            map: ConcurrentTtlMap::new(max_size, ttl),
            locks,
            lock_timeout,
            metrics: CacheMetrics::new(),
        }
    }

    /// Returns the cached value for `key`, or computes and stores it.
    ///
    /// The key's lock is held for the whole call, so concurrent callers for
    /// the same key serialize and `compute` runs at most once among them
    /// (absent a forced takeover). A compute error is propagated verbatim
    /// and nothing is stored or remembered about the failure: the next
    /// caller retries. The lock is released on every exit path.
    pub fn get_or_compute<F, E>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let _guard = self.locks.acquire(key, self.lock_timeout);

        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        self.metrics.record_compute();
        let value = match compute() {
            Ok(value) => Arc::new(value),
            Err(err) => {
                self.metrics.record_compute_failure();
                return Err(err);
            }
        };

        self.map.insert_arc(Arc::from(key), Arc::clone(&value));
        tracing::debug!(key, "value stored in cache");
        Ok(value)
    }

    /// Infallible convenience over [`get_or_compute`](Self::get_or_compute).
    pub fn get_or_insert_with<F>(&self, key: &str, f: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        match self.get_or_compute(key, || Ok::<V, Infallible>(f())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Expiry-checked lookup without computing anything.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.lookup(key)
    }

    fn lookup(&self, key: &str) -> Option<Arc<V>> {
        match self.map.get(key) {
            Some(hit) => {
                self.metrics.record_hit();
                tracing::debug!(key, "value retrieved from cache");
                Some(hit)
            }
            None => {
                self.metrics.record_miss();
                tracing::debug!(key, "no entry for key in cache");
                None
            }
        }
    }

    /// Stores a value directly, bypassing the compute path.
    pub fn insert(&self, key: &str, value: V) {
        self.map.insert_arc(Arc::from(key), Arc::new(value));
    }

    /// Eagerly removes expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.map.purge_expired()
    }

    /// Current number of entries (including not-yet-purged expired ones).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.map.clear()
    }

    /// Point-in-time metrics for this cache instance.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics
            .snapshot(self.locks.takeovers(), self.map.len(), self.map.max_size())
    }
}

impl<V> std::fmt::Debug for MemoCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("len", &self.map.len())
            .field("max_size", &self.map.max_size())
            .field("ttl", &self.map.ttl())
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl<V> Storage<V> for MemoCache<V> {
    type Guard<'a>
        = KeyLockGuard<'a>
    where
        Self: 'a;

    fn lock(&self, key: &str, timeout: Option<Duration>) -> KeyLockGuard<'_> {
        self.locks.acquire(key, timeout.or(self.lock_timeout))
    }

    fn get(&self, key: &str) -> Option<Arc<V>> {
        self.lookup(key)
    }

    fn set(&self, key: &str, value: Arc<V>) {
        // A store through the seam is the tail of a wrapper-driven
        // computation, so it counts toward `computes` just like the
        // orchestrated path.
        self.metrics.record_compute();
        self.map.insert_arc(Arc::from(key), value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    fn unbounded() -> MemoCache<String> {
        MemoCache::new(None, None, None)
    }

    #[test]
    fn miss_computes_and_stores() {
        let cache = unbounded();
        let value = cache
            .get_or_compute("k", || Ok::<_, String>("computed".to_string()))
            .unwrap();
        assert_eq!(*value, "computed");
        assert_eq!(cache.get("k").as_deref(), Some(&"computed".to_string()));
    }

    #[test]
    fn hit_skips_compute() {
        let cache = unbounded();
        cache.insert("k", "stored".to_string());

        let value = cache
            .get_or_compute("k", || -> Result<String, String> {
                panic!("compute must not run on a hit")
            })
            .unwrap();
        assert_eq!(*value, "stored");
    }

    #[test]
    fn compute_error_propagates_and_stores_nothing() {
        let cache = unbounded();
        let err = cache
            .get_or_compute("k", || Err::<String, _>("boom".to_string()))
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.get("k").is_none());

        // No negative caching: the next call retries and can succeed.
        let value = cache
            .get_or_compute("k", || Ok::<_, String>("recovered".to_string()))
            .unwrap();
        assert_eq!(*value, "recovered");
    }

    #[test]
    fn lock_released_after_compute_error() {
        let cache = unbounded();
        let _ = cache.get_or_compute("k", || Err::<String, _>(()));
        // A second call on the same key must not deadlock.
        let value = cache.get_or_insert_with("k", || "ok".to_string());
        assert_eq!(*value, "ok");
    }

    #[test]
    fn ttl_expiry_triggers_recompute() {
        let ttl = Duration::from_millis(40);
        let cache: MemoCache<u32> = MemoCache::new(None, Some(ttl), None);
        let calls = AtomicUsize::new(0);

        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(1)
        };
        cache.get_or_compute("k", compute).unwrap();
        cache.get_or_compute("k", compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        thread::sleep(ttl + Duration::from_millis(20));
        cache.get_or_compute("k", compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bounded_cache_evicts_lru_key() {
        let cache: MemoCache<u32> = MemoCache::new(Some(2), None, None);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert!(cache.get("a").is_some()); // "b" is now LRU
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn metrics_track_the_protocol() {
        let cache = unbounded();
        cache.get_or_insert_with("k", || "v".to_string()); // miss + compute
        cache.get_or_insert_with("k", || "v".to_string()); // hit
        let _ = cache.get_or_compute("other", || Err::<String, _>(())); // miss + failure

        let snap = cache.metrics();
        assert_eq!(snap.get_hits, 1);
        assert_eq!(snap.get_misses, 2);
        assert_eq!(snap.computes, 2);
        assert_eq!(snap.compute_failures, 1);
        assert_eq!(snap.lock_takeovers, 0);
        assert_eq!(snap.cache_len, 1);
    }

    #[test]
    fn storage_trait_roundtrip() {
        fn exercise<S: Storage<String>>(storage: &S) {
            let guard = storage.lock("k", None);
            assert!(storage.get("k").is_none());
            storage.set("k", Arc::new("v".to_string()));
            drop(guard);
            assert_eq!(storage.get("k").as_deref(), Some(&"v".to_string()));
        }
        exercise(&unbounded());
    }
}
