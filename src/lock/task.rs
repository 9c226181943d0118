//! Cooperative (task-suspending) per-key lock registry.
//!
//! Same state machine and forced-takeover semantics as
//! [`thread::KeyLockRegistry`](crate::lock::thread::KeyLockRegistry), but
//! waiting suspends the calling task instead of blocking a thread: waiters
//! park on a registry-wide [`tokio::sync::Notify`] and re-check the
//! held-map on every wake-all, with the deadline enforced by
//! `tokio::time::timeout_at`.
//!
//! The held-map mutex is a `parking_lot::Mutex` and is never held across an
//! await point; only the wait itself suspends, so tasks working on other
//! keys always make progress.
//!
//! ## Cancel safety
//!
//! `acquire` mutates the registry only in the same poll in which it
//! returns. A task cancelled while suspended never appears in the held-map,
//! and dropping its wait future deregisters it from the `Notify` wait set,
//! so cancellation cannot corrupt registry state or strand other waiters.

use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::lock::{HolderId, RegistryCore, TakeoverHook};

/// Cooperative per-key lock registry for async callers.
pub struct AsyncKeyLockRegistry {
    state: Mutex<RegistryCore>,
    notify: Notify,
    takeovers: AtomicU64,
    on_takeover: Option<TakeoverHook>,
}

impl Default for AsyncKeyLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncKeyLockRegistry {
    /// Creates a registry with no takeover hook.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryCore::new()),
            notify: Notify::new(),
            takeovers: AtomicU64::new(0),
            on_takeover: None,
        }
    }

    /// Creates a registry that invokes `hook` on every forced takeover.
    pub fn with_takeover_hook(hook: TakeoverHook) -> Self {
        Self {
            on_takeover: Some(hook),
            ..Self::new()
        }
    }

    /// Acquires the lock for `key`, suspending while another holder has it.
    ///
    /// Timeout semantics match the blocking flavor: a waiter whose deadline
    /// passes takes the lock over from the current holder instead of
    /// failing. The returned guard releases on drop.
    #[must_use = "dropping the guard releases the lock immediately"]
    pub async fn acquire(&self, key: &str, timeout: Option<Duration>) -> AsyncKeyLockGuard<'_> {
        let holder = HolderId::next();
        let key: Arc<str> = Arc::from(key);
        let deadline = timeout.map(|t| Instant::now() + t);

        let mut notified = pin!(self.notify.notified());
        loop {
            // Register for a wakeup before checking the held-map, so a
            // release between the check and the await cannot be missed.
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.try_acquire(&key, holder) {
                    return AsyncKeyLockGuard {
                        registry: self,
                        key,
                        holder,
                        forced: false,
                    };
                }
            }
            tracing::debug!(key = %key, "key is in use, waiting for release");

            match deadline {
                None => {
                    notified.as_mut().await;
                }
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified.as_mut())
                        .await
                        .is_err()
                    {
                        return self.force(key, holder);
                    }
                }
            }

            // Re-arm for the next iteration; the consumed future is spent.
            notified.set(self.notify.notified());
        }
    }

    fn force(&self, key: Arc<str>, holder: HolderId) -> AsyncKeyLockGuard<'_> {
        let mut forced = false;
        {
            let mut state = self.state.lock();
            // The holder may have released between the timeout firing and
            // this point; only count a takeover when one actually happens.
            if !state.try_acquire(&key, holder) {
                state.force_acquire(&key, holder);
                forced = true;
            }
        }

        if forced {
            self.takeovers.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "timeout waiting for key lock, forcing acquisition");
            if let Some(hook) = &self.on_takeover {
                hook(&key);
            }
        }

        AsyncKeyLockGuard {
            registry: self,
            key,
            holder,
            forced,
        }
    }

    /// Number of forced takeovers since the registry was created.
    pub fn takeovers(&self) -> u64 {
        self.takeovers.load(Ordering::Relaxed)
    }

    /// Number of keys currently held.
    pub fn held_count(&self) -> usize {
        self.state.lock().held_count()
    }

    fn release(&self, key: &str, holder: HolderId) {
        let mut state = self.state.lock();
        state.release(key, holder);
        drop(state);
        tracing::debug!(key = %key, "key lock released");
        // Wake everyone even when the release was a stale no-op, so waiters
        // re-check the held-map rather than sleeping on a dead holder.
        self.notify.notify_waiters();
    }
}

impl std::fmt::Debug for AsyncKeyLockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncKeyLockRegistry")
            .field("held", &self.held_count())
            .field("takeovers", &self.takeovers())
            .finish_non_exhaustive()
    }
}

/// RAII ownership of one key's lock; releases on drop.
///
/// Safe to hold across await points: the registry's internal mutex is not
/// held by the guard, only the logical key ownership.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct AsyncKeyLockGuard<'a> {
    registry: &'a AsyncKeyLockRegistry,
    key: Arc<str>,
    holder: HolderId,
    forced: bool,
}

impl AsyncKeyLockGuard<'_> {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this acquisition superseded a stalled holder after a timeout.
    pub fn took_over(&self) -> bool {
        self.forced
    }
}

impl Drop for AsyncKeyLockGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.holder);
    }
}

impl std::fmt::Debug for AsyncKeyLockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncKeyLockGuard")
            .field("key", &self.key)
            .field("forced", &self.forced)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
