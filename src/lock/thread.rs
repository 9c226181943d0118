//! Blocking per-key lock registry.
//!
//! The thread-side front-end over [`RegistryCore`]: one
//! `parking_lot::Mutex` guards the held-map and a single `Condvar` carries
//! every waiter (wake-all + re-check is cheap relative to lock hold times,
//! so there is no per-key wait queue).
//!
//! ## Acquisition states
//!
//! ```text
//!   acquire(key, timeout)
//!        │
//!        ├── key FREE ──────────────────────────────► HELD(me), return
//!        │
//!        └── key HELD ──► wait on condvar ──► woken ──► re-check
//!                              │
//!                              └── deadline passed ──► force_acquire(me)
//!                                                      (takeover, counted)
//! ```
//!
//! Guards release on drop, so the lock is freed on every exit path of the
//! caller, including panics and error returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::lock::{HolderId, RegistryCore, TakeoverHook};

/// Blocking per-key lock registry.
///
/// Grants exclusive ownership of a string key to exactly one caller at a
/// time. Waiting callers block on a registry-wide condition variable;
/// callers on other keys are unaffected beyond the brief held-map lock.
pub struct KeyLockRegistry {
    state: Mutex<RegistryCore>,
    available: Condvar,
    takeovers: AtomicU64,
    on_takeover: Option<TakeoverHook>,
}

impl Default for KeyLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyLockRegistry {
    /// Creates a registry with no takeover hook.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryCore::new()),
            available: Condvar::new(),
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

    /// Acquires the lock for `key`, blocking while another holder has it.
    ///
    /// With `timeout = None` this waits indefinitely. With a timeout, a
    /// waiter whose deadline passes stops waiting and **takes the lock
    /// over** from the current holder rather than failing; the superseded
    /// holder's eventual release becomes a no-op. See the module docs for
    /// the trade-off.
    #[must_use = "dropping the guard releases the lock immediately"]
    pub fn acquire(&self, key: &str, timeout: Option<Duration>) -> KeyLockGuard<'_> {
        let holder = HolderId::next();
        let key: Arc<str> = Arc::from(key);
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut forced = false;

        {
            let mut state = self.state.lock();
            loop {
                if state.try_acquire(&key, holder) {
                    break;
                }
                tracing::debug!(key = %key, "key is in use, waiting for release");

                match deadline {
                    None => {
                        self.available.wait(&mut state);
                    }
                    Some(deadline) => {
                        if Instant::now() >= deadline
                            || self.available.wait_until(&mut state, deadline).timed_out()
                        {
                            // One last chance: the holder may have released
                            // during the final wait interval.
                            if state.try_acquire(&key, holder) {
                                break;
                            }
                            state.force_acquire(&key, holder);
                            forced = true;
                            break;
                        }
                    }
                }
            }
        }

        if forced {
            self.takeovers.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "timeout waiting for key lock, forcing acquisition");
            if let Some(hook) = &self.on_takeover {
                hook(&key);
            }
        }

        KeyLockGuard {
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
        tracing::debug!(key = %key, "key lock released");
        // Wake everyone even when the release was a stale no-op, so waiters
        // re-check the held-map rather than sleeping on a dead holder.
        self.available.notify_all();
    }
}

impl std::fmt::Debug for KeyLockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLockRegistry")
            .field("held", &self.held_count())
            .field("takeovers", &self.takeovers())
            .finish_non_exhaustive()
    }
}

/// RAII ownership of one key's lock; releases on drop.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct KeyLockGuard<'a> {
    registry: &'a KeyLockRegistry,
    key: Arc<str>,
    holder: HolderId,
    forced: bool,
}

impl KeyLockGuard<'_> {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this acquisition superseded a stalled holder after a timeout.
    pub fn took_over(&self) -> bool {
        self.forced
    }
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.holder);
    }
}

impl std::fmt::Debug for KeyLockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLockGuard")
            .field("key", &self.key)
            .field("forced", &self.forced)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
