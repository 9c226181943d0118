//! Memoized-function wrappers.
//!
//! The thin glue between a plain function and a storage: a [`Memo`] bundles
//! the function, a caller-supplied key function (`Fn(&Args) -> String` —
//! key derivation itself is the caller's business), and an explicitly owned
//! [`Storage`], then drives the single-flight protocol on every call:
//!
//! ```text
//!   call(args) ──► key = key_fn(args)
//!                  lock(key) ──► get(key) ──hit──► return
//!                                    │
//!                                  miss ──► func(args) ──► set(key, result)
//! ```
//!
//! The storage is a constructor argument, not ambient global state, so two
//! wrappers never share a cache unless handed the same instance (e.g. via
//! `Arc`).
//!
//! ## Example
//!
//! ```
//! use memokit::builder::CacheBuilder;
//! use memokit::memo::Memo;
//!
//! let memo = Memo::new(
//!     CacheBuilder::new().try_build::<u64>().unwrap(),
//!     |&(a, b): &(u64, u64)| a + b,
//!     |&(a, b): &(u64, u64)| format!("add:{a}:{b}"),
//! );
//! assert_eq!(*memo.call(&(2, 3)), 5);
//! assert_eq!(*memo.call(&(2, 3)), 5); // served from cache
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::traits::{AsyncStorage, Storage};

/// A memoized blocking function: function + key function + owned storage.
pub struct Memo<S, F, K> {
    storage: S,
    func: F,
    key_fn: K,
}

impl<S, F, K> Memo<S, F, K> {
    /// Bundles a function with its cache key derivation and storage.
    pub fn new(storage: S, func: F, key_fn: K) -> Self {
        Self { storage, func, key_fn }
    }

    /// The underlying storage, e.g. for metrics or direct invalidation.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Invokes the memoized function: returns the cached result for the
    /// derived key, or runs `func` under the key's lock and stores it.
    pub fn call<A, V>(&self, args: &A) -> Arc<V>
    where
        S: Storage<V>,
        F: Fn(&A) -> V,
        K: Fn(&A) -> String,
    {
        let key = (self.key_fn)(args);
        let _guard = self.storage.lock(&key, None);

        if let Some(hit) = self.storage.get(&key) {
            return hit;
        }

        let value = Arc::new((self.func)(args));
        self.storage.set(&key, Arc::clone(&value));
        value
    }

    /// Fallible flavor of [`call`](Self::call): an `Err` from `func` is
    /// propagated verbatim and nothing is stored (no negative caching).
    pub fn try_call<A, V, E>(&self, args: &A) -> Result<Arc<V>, E>
    where
        S: Storage<V>,
        F: Fn(&A) -> Result<V, E>,
        K: Fn(&A) -> String,
    {
        let key = (self.key_fn)(args);
        let _guard = self.storage.lock(&key, None);

        if let Some(hit) = self.storage.get(&key) {
            return Ok(hit);
        }

        let value = Arc::new((self.func)(args)?);
        self.storage.set(&key, Arc::clone(&value));
        Ok(value)
    }
}

/// A memoized async function; semantics match [`Memo`], with lock waits
/// suspending the task.
pub struct AsyncMemo<S, F, K> {
    storage: S,
    func: F,
    key_fn: K,
}

impl<S, F, K> AsyncMemo<S, F, K> {
    /// Bundles an async function with its cache key derivation and storage.
    pub fn new(storage: S, func: F, key_fn: K) -> Self {
        Self { storage, func, key_fn }
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Invokes the memoized function, awaiting the compute future under the
    /// key's logical lock on a miss.
    pub async fn call<A, V, Fut>(&self, args: &A) -> Arc<V>
    where
        S: AsyncStorage<V>,
        F: Fn(&A) -> Fut,
        Fut: Future<Output = V>,
        K: Fn(&A) -> String,
    {
        let key = (self.key_fn)(args);
        let _guard = self.storage.lock(&key, None).await;

        if let Some(hit) = self.storage.get(&key).await {
            return hit;
        }

        let value = Arc::new((self.func)(args).await);
        self.storage.set(&key, Arc::clone(&value)).await;
        value
    }

    /// Fallible flavor of [`call`](Self::call); `Err` is propagated and
    /// nothing is stored.
    pub async fn try_call<A, V, E, Fut>(&self, args: &A) -> Result<Arc<V>, E>
    where
        S: AsyncStorage<V>,
        F: Fn(&A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        K: Fn(&A) -> String,
    {
        let key = (self.key_fn)(args);
        let _guard = self.storage.lock(&key, None).await;

        if let Some(hit) = self.storage.get(&key).await {
            return Ok(hit);
        }

        let value = Arc::new((self.func)(args).await?);
        self.storage.set(&key, Arc::clone(&value)).await;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
