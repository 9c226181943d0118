//! # Storage Trait Seam
//!
//! The contract the cache core exposes to its wrapper layer (the memoized
//! function adapters in [`memo`](crate::memo), or any caller-written
//! equivalent). The core consumes only an opaque string key per call; the
//! wrapper drives the single-flight protocol through three operations:
//!
//! | Operation              | Purpose                                      |
//! |------------------------|----------------------------------------------|
//! | `lock(key, timeout)`   | Exclusive per-key ownership, RAII guard      |
//! | `get(key)`             | Expiry-checked lookup, `Arc<V>` on hit       |
//! | `set(key, value)`      | Store a freshly computed result              |
//!
//! Two flavors with identical semantics: [`Storage`] blocks the calling
//! thread on lock waits, [`AsyncStorage`] suspends the calling task. The
//! guard is a generic associated type so implementations can return their
//! own RAII handle; dropping it releases the key on every exit path.
//!
//! Implemented by [`MemoCache`](crate::cache::sync::MemoCache) and
//! [`AsyncMemoCache`](crate::cache::task::AsyncMemoCache).

use std::sync::Arc;
use std::time::Duration;

/// Blocking storage contract: per-key locking plus expiring key/value
/// access, values shared as `Arc<V>`.
pub trait Storage<V> {
    /// RAII lock handle; releases the key when dropped.
    type Guard<'a>
    where
        Self: 'a;

    /// Acquires exclusive ownership of `key`, blocking while held elsewhere.
    /// A `timeout` bounds the wait via forced takeover, never by failing.
    fn lock(&self, key: &str, timeout: Option<Duration>) -> Self::Guard<'_>;

    /// Expiry-checked lookup.
    fn get(&self, key: &str) -> Option<Arc<V>>;

    /// Inserts or replaces the value for `key`, resetting its expiry.
    fn set(&self, key: &str, value: Arc<V>);
}

/// Cooperative storage contract; semantics identical to [`Storage`], but
/// lock waits suspend the task instead of blocking the thread.
// Callers needing `Send` futures use the concrete `AsyncMemoCache`, whose
// returned futures are `Send` whenever `V` is; the trait stays unbounded.
#[allow(async_fn_in_trait)]
pub trait AsyncStorage<V> {
    /// RAII lock handle; releases the key when dropped.
    type Guard<'a>
    where
        Self: 'a;

    /// Acquires exclusive ownership of `key`, suspending while held
    /// elsewhere. A `timeout` bounds the wait via forced takeover.
    async fn lock(&self, key: &str, timeout: Option<Duration>) -> Self::Guard<'_>;

    /// Expiry-checked lookup.
    async fn get(&self, key: &str) -> Option<Arc<V>>;

    /// Inserts or replaces the value for `key`, resetting its expiry.
    async fn set(&self, key: &str, value: Arc<V>);
}
