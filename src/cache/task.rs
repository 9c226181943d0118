//! Cooperative cache orchestrator.
//!
//! Mirrors [`sync::MemoCache`](crate::cache::sync::MemoCache) for async
//! callers: the same protocol over the same expiring map, with lock waits
//! suspending the task via
//! [`AsyncKeyLockRegistry`](crate::lock::task::AsyncKeyLockRegistry). The
//! logical key lock spans the entire compute future, however long it
//! suspends; only the lock *wait* is a suspension point of the cache
//! itself.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::lock::{AsyncKeyLockGuard, AsyncKeyLockRegistry, TakeoverHook};
use crate::metrics::{CacheMetrics, MetricsSnapshot};
use crate::store::ttl_map::ConcurrentTtlMap;
use crate::traits::AsyncStorage;

/// Single-flight memoization cache for async callers.
///
/// # Example
///
/// ```
/// use memokit::builder::CacheBuilder;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = CacheBuilder::new().try_build_async::<u64>().unwrap();
/// let value = cache
///     .get_or_compute("answer", || async { Ok::<_, std::io::Error>(42) })
///     .await
///     .unwrap();
/// assert_eq!(*value, 42);
/// # }
/// ```
pub struct AsyncMemoCache<V> {
    map: ConcurrentTtlMap<Arc<str>, V>,
    locks: AsyncKeyLockRegistry,
    lock_timeout: Option<Duration>,
    metrics: CacheMetrics,
}

impl<V> AsyncMemoCache<V> {
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
            Some(hook) => AsyncKeyLockRegistry::with_takeover_hook(hook),
            None => AsyncKeyLockRegistry::new(),
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
    /// Semantics match the blocking flavor: the key's logical lock is held
    /// across both the lookup and the compute future, a compute error is
    /// propagated verbatim with nothing stored, and the lock is released on
    /// every exit path (including cancellation of this future, via the
    /// guard's destructor once acquired).
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let _guard = self.locks.acquire(key, self.lock_timeout).await;

        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        self.metrics.record_compute();
        let value = match compute().await {
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
    pub async fn get_or_insert_with<F, Fut>(&self, key: &str, f: F) -> Arc<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let result = self
            .get_or_compute(key, || async { Ok::<V, Infallible>(f().await) })
            .await;
        match result {
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

impl<V> std::fmt::Debug for AsyncMemoCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncMemoCache")
            .field("len", &self.map.len())
            .field("max_size", &self.map.max_size())
            .field("ttl", &self.map.ttl())
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl<V> AsyncStorage<V> for AsyncMemoCache<V> {
    type Guard<'a>
        = AsyncKeyLockGuard<'a>
    where
        Self: 'a;

    async fn lock(&self, key: &str, timeout: Option<Duration>) -> AsyncKeyLockGuard<'_> {
        self.locks.acquire(key, timeout.or(self.lock_timeout)).await
    }

    async fn get(&self, key: &str) -> Option<Arc<V>> {
        self.lookup(key)
    }

    async fn set(&self, key: &str, value: Arc<V>) {
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

    use super::*;

    fn unbounded() -> AsyncMemoCache<String> {
        AsyncMemoCache::new(None, None, None)
    }

    #[tokio::test]
    async fn miss_computes_and_stores() {
        let cache = unbounded();
        let value = cache
            .get_or_compute("k", || async { Ok::<_, String>("computed".to_string()) })
            .await
            .unwrap();
        assert_eq!(*value, "computed");
        assert_eq!(cache.get("k").as_deref(), Some(&"computed".to_string()));
    }

    #[tokio::test]
    async fn hit_skips_compute() {
        let cache = unbounded();
        cache.insert("k", "stored".to_string());

        let ran = AtomicUsize::new(0);
        let value = cache
            .get_or_compute("k", || async {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>("fresh".to_string())
            })
            .await
            .unwrap();
        assert_eq!(*value, "stored");
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn compute_error_propagates_and_stores_nothing() {
        let cache = unbounded();
        let err = cache
            .get_or_compute("k", || async { Err::<String, _>("boom".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.get("k").is_none());

        let value = cache
            .get_or_compute("k", || async { Ok::<_, String>("recovered".to_string()) })
            .await
            .unwrap();
        assert_eq!(*value, "recovered");
    }

    #[tokio::test]
    async fn lock_released_after_compute_error() {
        let cache = unbounded();
        let _ = cache
            .get_or_compute("k", || async { Err::<String, _>(()) })
            .await;
        let value = cache.get_or_insert_with("k", || async { "ok".to_string() }).await;
        assert_eq!(*value, "ok");
    }

    #[tokio::test]
    async fn ttl_expiry_triggers_recompute() {
        let ttl = Duration::from_millis(40);
        let cache: AsyncMemoCache<u32> = AsyncMemoCache::new(None, Some(ttl), None);
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(1)
        };
        cache.get_or_compute("k", compute).await.unwrap();
        cache.get_or_compute("k", compute).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(ttl + Duration::from_millis(20)).await;
        cache.get_or_compute("k", compute).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn async_storage_trait_roundtrip() {
        async fn exercise<S: AsyncStorage<String>>(storage: &S) {
            let guard = storage.lock("k", None).await;
            assert!(storage.get("k").await.is_none());
            storage.set("k", Arc::new("v".to_string())).await;
            drop(guard);
            assert_eq!(storage.get("k").await.as_deref(), Some(&"v".to_string()));
        }
        exercise(&unbounded()).await;
    }

    #[tokio::test]
    async fn metrics_track_the_protocol() {
        let cache = unbounded();
        cache.get_or_insert_with("k", || async { "v".to_string() }).await;
        cache.get_or_insert_with("k", || async { "v".to_string() }).await;
        let _ = cache
            .get_or_compute("other", || async { Err::<String, _>(()) })
            .await;

        let snap = cache.metrics();
        assert_eq!(snap.get_hits, 1);
        assert_eq!(snap.get_misses, 2);
        assert_eq!(snap.computes, 2);
        assert_eq!(snap.compute_failures, 1);
        assert_eq!(snap.cache_len, 1);
    }
}
