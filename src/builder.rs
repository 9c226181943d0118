//! Unified builder for memoization caches.
//!
//! Validated construction for both orchestrator flavors while hiding the
//! internal wiring (map, lock registry, metrics). Defaults match a small
//! per-function result cache: `max_size = 1024`, `ttl = 60 s`, no
//! lock-wait timeout (waiters wait indefinitely, so no forced takeovers).
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use memokit::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::new()
//!     .max_size(256)
//!     .ttl(Duration::from_secs(30))
//!     .try_build::<String>()
//!     .unwrap();
//! cache.insert("k", "hello".to_string());
//! assert_eq!(cache.get("k").as_deref(), Some(&"hello".to_string()));
//! ```

use std::time::Duration;

use crate::cache::{AsyncMemoCache, MemoCache};
use crate::error::ConfigError;
use crate::lock::TakeoverHook;

/// Builder for [`MemoCache`] and [`AsyncMemoCache`] instances.
///
/// The same configuration builds either flavor; pick at the end with
/// [`try_build`](Self::try_build) (blocking) or
/// [`try_build_async`](Self::try_build_async) (cooperative).
pub struct CacheBuilder {
    max_size: Option<usize>,
    ttl: Option<Duration>,
    lock_timeout: Option<Duration>,
    on_takeover: Option<TakeoverHook>,
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBuilder {
    /// Creates a builder with the default bounds.
    pub fn new() -> Self {
        Self {
            max_size: Some(1024),
            ttl: Some(Duration::from_secs(60)),
            lock_timeout: None,
            on_takeover: None,
        }
    }

    /// Maximum number of cached entries. Must be non-zero; use
    /// [`unbounded`](Self::unbounded) to lift the limit entirely.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Removes the entry-count limit (nothing is ever evicted).
    pub fn unbounded(mut self) -> Self {
        self.max_size = None;
        self
    }

    /// Time-to-live applied to every stored entry. Must be non-zero; use
    /// [`no_ttl`](Self::no_ttl) for entries that never expire.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Entries never expire.
    pub fn no_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Bounds every lock wait: a waiter whose timeout elapses forcibly
    /// takes the lock over from its current holder and proceeds (it does
    /// not fail). Liveness over isolation; leave unset to wait
    /// indefinitely.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Observes forced takeovers: `hook` runs with the affected key each
    /// time a timed-out waiter supersedes a holder.
    pub fn on_takeover(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_takeover = Some(std::sync::Arc::new(hook));
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == Some(0) {
            return Err(ConfigError::new(
                "max_size must be greater than 0; use unbounded() for no limit",
            ));
        }
        if self.ttl == Some(Duration::ZERO) {
            return Err(ConfigError::new(
                "ttl must be greater than zero; use no_ttl() to disable expiry",
            ));
        }
        if self.lock_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::new(
                "lock_timeout must be greater than zero; leave it unset to wait indefinitely",
            ));
        }
        Ok(())
    }

    /// Builds a blocking cache, rejecting invalid configuration.
    pub fn try_build<V>(self) -> Result<MemoCache<V>, ConfigError> {
        self.validate()?;
        Ok(MemoCache::from_parts(
            self.max_size,
            self.ttl,
            self.lock_timeout,
            self.on_takeover,
        ))
    }

    /// Builds a cooperative cache, rejecting invalid configuration.
    pub fn try_build_async<V>(self) -> Result<AsyncMemoCache<V>, ConfigError> {
        self.validate()?;
        Ok(AsyncMemoCache::from_parts(
            self.max_size,
            self.ttl,
            self.lock_timeout,
            self.on_takeover,
        ))
    }
}

impl std::fmt::Debug for CacheBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .field("lock_timeout", &self.lock_timeout)
            .field("on_takeover", &self.on_takeover.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
