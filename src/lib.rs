//! # memokit
//!
//! Single-flight function-result memoization: an in-process cache with TTL
//! expiry and LRU-bounded size, plus a per-key locking discipline that lets
//! at most one computation for a given key run at a time. Concurrent
//! callers of the same key wait for the first computation and share its
//! result; unrelated keys never block each other.
//!
//! ## Module map
//!
//! | Module      | What lives there                                         |
//! |-------------|----------------------------------------------------------|
//! | [`store`]   | TTL + LRU bounded map (`TtlMapCore`, `ConcurrentTtlMap`) |
//! | [`lock`]    | Per-key lock registries, blocking and cooperative        |
//! | [`cache`]   | `get_or_compute` orchestrators over map + locks          |
//! | [`builder`] | Validated construction of either cache flavor            |
//! | [`memo`]    | Memoized-function wrappers over the storage seam         |
//! | [`traits`]  | `Storage` / `AsyncStorage` seam                          |
//! | [`metrics`] | Hit/miss/compute/takeover counters and snapshots         |
//! | [`error`]   | Configuration errors                                     |
//! | [`prelude`] | One-stop re-exports                                      |
//!
//! ## Quick start
//!
//! ```
//! use std::time::Duration;
//!
//! use memokit::prelude::*;
//!
//! let cache = CacheBuilder::new()
//!     .max_size(256)
//!     .ttl(Duration::from_secs(30))
//!     .try_build::<String>()
//!     .unwrap();
//!
//! let value = cache.get_or_insert_with("user:42", || {
//!     // Runs at most once per key while the entry is live, even when
//!     // called from many threads at the same moment.
//!     "expensive result".to_string()
//! });
//! assert_eq!(*value, "expensive result");
//! ```
//!
//! An async flavor with identical semantics is built with
//! [`CacheBuilder::try_build_async`](builder::CacheBuilder::try_build_async);
//! its lock waits suspend the task instead of blocking the thread.

pub mod builder;
pub mod cache;
pub mod error;
pub mod lock;
pub mod memo;
pub mod metrics;
pub mod prelude;
pub mod store;
pub mod traits;
