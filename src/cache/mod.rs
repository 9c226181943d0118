//! # Cache Orchestrators
//!
//! The get-or-compute protocol composing the expiring bounded map with a
//! per-key lock registry:
//!
//! ```text
//!   get_or_compute(key, compute)
//!        │
//!        ▼
//!   acquire key lock ──► map.get(key) ──hit──► release, return Arc<V>
//!                              │
//!                            miss
//!                              │
//!                              ▼
//!                        compute() ──Err──► release, propagate
//!                              │            (nothing stored)
//!                             Ok
//!                              │
//!                              ▼
//!                    map.insert(key, value) ──► release, return Arc<V>
//! ```
//!
//! Holding the key lock across both the lookup and the compute call is what
//! gives single-flight semantics: concurrent callers for one key serialize
//! on the lock, so only the first to acquire it computes; the rest observe
//! the freshly stored entry on wake. Callers on other keys only ever meet
//! at the map's internal lock, which is held for single operations.
//!
//! Two flavors sharing this protocol: [`sync::MemoCache`] for blocking
//! callers, [`task::AsyncMemoCache`] for async callers.

pub mod sync;
pub mod task;

pub use sync::MemoCache;
pub use task::AsyncMemoCache;
