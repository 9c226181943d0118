//! # Per-Key Lock Registry
//!
//! Single-flight locking: at most one in-flight computation per cache key,
//! with unrelated keys never blocking each other.
//!
//! One state machine, two front-ends:
//!
//! ```text
//!                      ┌───────────────────────────────┐
//!                      │         RegistryCore          │
//!                      │                               │
//!                      │  held: FxHashMap<key, holder> │
//!                      │                               │
//!                      │   FREE ──try_acquire──► HELD  │
//!                      │   HELD ──release(own)──► FREE │
//!                      │   HELD ──force_acquire─► HELD │  (new holder)
//!                      └──────┬───────────────┬────────┘
//!                             │               │
//!              ┌──────────────┴───┐       ┌───┴──────────────────┐
//!              │ thread::          │       │ task::               │
//!              │ KeyLockRegistry   │       │ AsyncKeyLockRegistry │
//!              │ Mutex + Condvar   │       │ Mutex + tokio Notify │
//!              │ (blocking waits)  │       │ (suspending waits)   │
//!              └──────────────────┘       └──────────────────────┘
//! ```
//!
//! ## Timeout semantics
//!
//! A waiter whose configured timeout elapses does not fail: it **forces**
//! the key into its own hands and proceeds (forced takeover). This trades
//! isolation for liveness when a holder stalls; the superseded holder's
//! eventual release is a no-op on the held-map because its [`HolderId`] no
//! longer matches. Takeovers are observable through per-registry counters,
//! an optional [`TakeoverHook`], and `took_over()` on the guards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

pub mod task;
pub mod thread;

pub use task::{AsyncKeyLockGuard, AsyncKeyLockRegistry};
pub use thread::{KeyLockGuard, KeyLockRegistry};

/// Callback invoked with the cache key each time a timed-out waiter forcibly
/// takes a lock over from its current holder.
pub type TakeoverHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Opaque identity of a single acquisition attempt.
///
/// Holder identities are what keep a forced takeover safe: a waiter that was
/// superseded still runs its release on drop, but the registry only frees
/// the key when the releasing identity matches the current holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(u64);

impl HolderId {
    /// Returns a process-unique holder identity.
    #[inline]
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        HolderId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The lock state machine shared by both registry flavors.
///
/// A key is *free* (absent) or *held* by exactly one [`HolderId`]. All
/// transitions happen under the owning registry's mutex; the core itself
/// carries no synchronization.
#[derive(Debug, Default)]
pub(crate) struct RegistryCore {
    held: FxHashMap<Arc<str>, HolderId>,
}

impl RegistryCore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether the key currently has a holder.
    #[cfg(test)]
    pub(crate) fn is_held(&self, key: &str) -> bool {
        self.held.contains_key(key)
    }

    /// `FREE -> HELD(holder)`; returns false when the key is already held.
    pub(crate) fn try_acquire(&mut self, key: &Arc<str>, holder: HolderId) -> bool {
        if self.held.contains_key(key.as_ref()) {
            return false;
        }
        self.held.insert(Arc::clone(key), holder);
        true
    }

    /// Unconditional transition to `HELD(holder)`, superseding any current
    /// holder. Returns the displaced identity, if there was one.
    pub(crate) fn force_acquire(&mut self, key: &Arc<str>, holder: HolderId) -> Option<HolderId> {
        self.held.insert(Arc::clone(key), holder)
    }

    /// `HELD(holder) -> FREE` only when the identities match; a superseded
    /// holder's release leaves the key in its new owner's hands. Returns
    /// whether the key was actually freed.
    pub(crate) fn release(&mut self, key: &str, holder: HolderId) -> bool {
        if self.held.get(key) == Some(&holder) {
            self.held.remove(key);
            return true;
        }
        false
    }

    /// Number of keys currently held.
    #[inline]
    pub(crate) fn held_count(&self) -> usize {
        self.held.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn holder_ids_are_unique() {
        let a = HolderId::next();
        let b = HolderId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn try_acquire_free_then_held() {
        let mut core = RegistryCore::new();
        let k = key("k");
        let first = HolderId::next();
        let second = HolderId::next();

        assert!(core.try_acquire(&k, first));
        assert!(core.is_held("k"));
        assert!(!core.try_acquire(&k, second));
        assert_eq!(core.held_count(), 1);
    }

    #[test]
    fn release_requires_matching_holder() {
        let mut core = RegistryCore::new();
        let k = key("k");
        let owner = HolderId::next();
        let stranger = HolderId::next();

        core.try_acquire(&k, owner);
        assert!(!core.release("k", stranger));
        assert!(core.is_held("k"));
        assert!(core.release("k", owner));
        assert!(!core.is_held("k"));
    }

    #[test]
    fn force_acquire_displaces_holder() {
        let mut core = RegistryCore::new();
        let k = key("k");
        let original = HolderId::next();
        let usurper = HolderId::next();

        core.try_acquire(&k, original);
        assert_eq!(core.force_acquire(&k, usurper), Some(original));

        // The displaced holder can no longer free the key.
        assert!(!core.release("k", original));
        assert!(core.is_held("k"));
        assert!(core.release("k", usurper));
    }

    #[test]
    fn keys_are_independent() {
        let mut core = RegistryCore::new();
        let a = HolderId::next();
        let b = HolderId::next();

        assert!(core.try_acquire(&key("a"), a));
        assert!(core.try_acquire(&key("b"), b));
        assert_eq!(core.held_count(), 2);
    }
}
