//! # Expiring Bounded Map (TTL + LRU)
//!
//! The value store behind every memoization cache in this crate: a key/value
//! map with per-entry time-to-live and a maximum entry count, evicting by
//! recency when full and treating expired entries as absent on read.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                     ConcurrentTtlMap<K, V>                       │
//!   │                                                                  │
//!   │              Arc<parking_lot::RwLock<TtlMapCore>>                │
//!   │                              │                                   │
//!   │                              ▼                                   │
//!   │   ┌────────────────────────────────────────────────────────────┐ │
//!   │   │                      TtlMapCore<K, V>                      │ │
//!   │   │                                                            │ │
//!   │   │   FxHashMap<K, NonNull<Node>>     (O(1) index)             │ │
//!   │   │                                                            │ │
//!   │   │   head ──► ┌──────┐ ◄──► ┌──────┐ ◄──► ┌──────┐ ◄── tail   │ │
//!   │   │     (MRU)  │ Node │      │ Node │      │ Node │   (LRU)    │ │
//!   │   │            └──────┘      └──────┘      └──────┘            │ │
//!   │   │                                                            │ │
//!   │   │   Node = { key, Arc<V>, inserted_at, expires_at, links }   │ │
//!   │   └────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Operations
//!
//! | Method            | Complexity | Description                              |
//! |-------------------|------------|------------------------------------------|
//! | `insert(k, v)`    | O(1)*      | Insert or replace, resets expiry,        |
//! |                   |            | may evict the LRU entry                  |
//! | `get(&k)`         | O(1)       | Expiry-checked lookup, moves to MRU;     |
//! |                   |            | removes the entry when expired           |
//! | `peek(&k)`        | O(1)       | Expiry-checked lookup, no reordering     |
//! | `contains(&k)`    | O(1)       | Expiry-aware existence check             |
//! | `remove(&k)`      | O(1)       | Remove entry by key                      |
//! | `pop_lru()`       | O(1)       | Remove and return least recently used    |
//! | `purge_expired()` | O(n)       | Eagerly drop every expired entry         |
//!
//! ## Semantics
//!
//! - **TTL**: each entry expires at `inserted_at + ttl`; a map built with
//!   `ttl = None` never expires entries. Expiry is lazy: an expired entry
//!   occupies a slot until a `get` touches it or `purge_expired` runs, but it
//!   is never observable through `get`/`peek`/`contains`.
//! - **Capacity**: `max_size = None` is unbounded; `Some(0)` accepts no
//!   insertions. When a new key arrives at capacity the entry at the list
//!   tail (least recently inserted-or-accessed) is evicted first.
//! - **Clock**: `std::time::Instant`, so wall-clock adjustments cannot
//!   expire or resurrect entries.
//!
//! ## Thread Safety
//!
//! - `TtlMapCore`: **NOT thread-safe**, single-threaded core.
//! - `ConcurrentTtlMap`: thread-safe wrapper. `get` takes the write lock
//!   because a hit reorders the recency list and an expired hit removes the
//!   entry; only non-mutating accessors use the read lock. This internal
//!   lock is what lets holders of *different* per-key locks touch the shared
//!   recency bookkeeping concurrently.
//! - Values are shared as `Arc<V>`, so callers keep their handle even after
//!   the entry is evicted or replaced.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Node in the recency linked list.
///
/// Layout keeps the list pointers first for traversal, the key for map
/// removal during eviction, and the timestamps needed for expiry checks.
#[repr(C)]
struct Node<K, V> {
    prev: Option<NonNull<Node<K, V>>>,
    next: Option<NonNull<Node<K, V>>>,
    key: K,
    value: Arc<V>,
    inserted_at: Instant,
    expires_at: Option<Instant>,
}

impl<K, V> Node<K, V> {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Single-threaded TTL + LRU map core using HashMap + raw pointer linked list.
///
/// Keys are owned twice (map index and node) and therefore must be `Clone`;
/// the intended key type is a cheap handle such as `Arc<str>`. Values are
/// `Arc<V>` for zero-copy sharing with callers.
///
/// ## Memory Safety
/// - Nodes are heap-allocated and tracked via `NonNull` pointers.
/// - The map owns the key-to-node mapping; every node pointer in the map is
///   also linked into the list and vice versa.
/// - All nodes are freed in `Drop`.
pub struct TtlMapCore<K, V>
where
    K: Eq + Hash + Clone,
{
    map: FxHashMap<K, NonNull<Node<K, V>>>,
    head: Option<NonNull<Node<K, V>>>,
    tail: Option<NonNull<Node<K, V>>>,
    max_size: Option<usize>,
    ttl: Option<Duration>,
}

// SAFETY: TtlMapCore can be sent between threads if K and V are Send.
// The raw pointers only reference heap memory owned by the struct.
unsafe impl<K, V> Send for TtlMapCore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send + Sync,
{
}

// SAFETY: shared access is read-only through &self methods; actual
// multi-threaded mutation goes through the RwLock in ConcurrentTtlMap.
unsafe impl<K, V> Sync for TtlMapCore<K, V>
where
    K: Eq + Hash + Clone + Sync,
    V: Send + Sync,
{
}

impl<K, V> TtlMapCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a new map core.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries; `None` is unbounded. A size
    ///   of `Some(0)` creates a map that accepts no items (all inserts are
    ///   no-ops).
    /// * `ttl` - Time-to-live applied to every inserted entry; `None` means
    ///   entries never expire.
    pub fn new(max_size: Option<usize>, ttl: Option<Duration>) -> Self {
        TtlMapCore {
            map: FxHashMap::with_capacity_and_hasher(max_size.unwrap_or(16), Default::default()),
            head: None,
            tail: None,
            max_size,
            ttl,
        }
    }

    /// Detach a node from the linked list without removing it from the map.
    #[inline(always)]
    fn detach(&mut self, node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_ref();
            let prev = node.prev;
            let next = node.next;

            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }

            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => self.tail = prev,
            }
        }
    }

    /// Attach a node at the front (MRU position).
    #[inline(always)]
    fn attach_front(&mut self, mut node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_mut();
            node.prev = None;
            node.next = self.head;

            match self.head {
                Some(mut h) => h.as_mut().prev = Some(node_ptr),
                None => self.tail = Some(node_ptr),
            }

            self.head = Some(node_ptr);
        }
    }

    /// Pop the tail node (LRU) and return it.
    #[inline(always)]
    fn pop_tail(&mut self) -> Option<Box<Node<K, V>>> {
        self.tail.map(|tail_ptr| unsafe {
            let node = Box::from_raw(tail_ptr.as_ptr());

            self.tail = node.prev;
            match self.tail {
                Some(mut t) => t.as_mut().next = None,
                None => self.head = None,
            }

            node
        })
    }

    /// Detach a node, remove it from the map and reclaim its allocation.
    #[inline]
    fn unlink(&mut self, node_ptr: NonNull<Node<K, V>>) -> Box<Node<K, V>> {
        self.detach(node_ptr);
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };
        self.map.remove(&node.key);
        node
    }

    /// Validate internal invariants (debug builds only).
    fn validate_invariants(&self) {
        #[cfg(debug_assertions)]
        {
            if self.map.is_empty() {
                debug_assert!(self.head.is_none());
                debug_assert!(self.tail.is_none());
                return;
            }

            let mut count = 0usize;
            let mut current = self.head;
            while let Some(ptr) = current {
                count += 1;
                unsafe {
                    let node = ptr.as_ref();
                    debug_assert!(self.map.contains_key(&node.key));
                    current = node.next;
                }
                if count > self.map.len() {
                    panic!("cycle detected in recency list");
                }
            }

            debug_assert_eq!(count, self.map.len());
            if let Some(max) = self.max_size {
                debug_assert!(self.map.len() <= max);
            }
        }
    }

    /// Inserts or replaces an entry, returning the replaced value.
    ///
    /// Replacement resets both `inserted_at` and `expires_at`, and moves the
    /// entry to the MRU position. A new key arriving at capacity evicts the
    /// LRU entry first.
    pub fn insert(&mut self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let now = Instant::now();
        let expires_at = self.ttl.map(|ttl| now + ttl);

        if let Some(&node_ptr) = self.map.get(&key) {
            let previous = unsafe {
                let node = &mut *node_ptr.as_ptr();
                node.inserted_at = now;
                node.expires_at = expires_at;
                std::mem::replace(&mut node.value, value)
            };

            self.detach(node_ptr);
            self.attach_front(node_ptr);

            self.validate_invariants();
            return Some(previous);
        }

        // Zero capacity accepts nothing.
        if self.max_size == Some(0) {
            return None;
        }

        if let Some(max) = self.max_size {
            if self.map.len() >= max {
                if let Some(evicted) = self.pop_tail() {
                    self.map.remove(&evicted.key);
                }
            }
        }

        let node = Box::new(Node {
            prev: None,
            next: None,
            key: key.clone(),
            value,
            inserted_at: now,
            expires_at,
        });
        let node_ptr = NonNull::from(Box::leak(node));

        self.map.insert(key, node_ptr);
        self.attach_front(node_ptr);

        self.validate_invariants();
        None
    }

    /// Expiry-checked lookup.
    ///
    /// A hit moves the entry to the MRU position and returns a clone of the
    /// `Arc` handle. A lookup that finds an expired entry removes it and
    /// returns `None`, exactly as if the key were absent.
    pub fn get<Q>(&mut self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let node_ptr = *self.map.get(key)?;

        if unsafe { node_ptr.as_ref() }.is_expired(Instant::now()) {
            drop(self.unlink(node_ptr));
            self.validate_invariants();
            return None;
        }

        self.detach(node_ptr);
        self.attach_front(node_ptr);

        self.validate_invariants();
        Some(Arc::clone(unsafe { &(*node_ptr.as_ptr()).value }))
    }

    /// Expiry-checked read-only lookup without recency update.
    ///
    /// Unlike [`get`](TtlMapCore::get), an expired entry is left in place
    /// (this method takes `&self`); it still reports `None`.
    pub fn peek<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let node = unsafe { self.map.get(key)?.as_ref() };
        if node.is_expired(Instant::now()) {
            return None;
        }
        Some(Arc::clone(&node.value))
    }

    /// Expiry-aware existence check, no side effects.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.peek(key).is_some()
    }

    /// Removes an entry by key, returning its value (even if expired).
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let node_ptr = self.map.remove(key)?;

        self.detach(node_ptr);
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };

        self.validate_invariants();
        Some(node.value)
    }

    /// Removes and returns the least recently used entry, expired or not.
    pub fn pop_lru(&mut self) -> Option<(K, Arc<V>)> {
        let node = self.pop_tail()?;
        self.map.remove(&node.key);

        self.validate_invariants();
        Some((node.key, node.value))
    }

    /// Eagerly removes every expired entry, returning how many were dropped.
    ///
    /// Purely an optimization hook: lazy expiry on `get` keeps observable
    /// behavior identical whether or not this ever runs.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut dropped = 0usize;
        let mut current = self.head;

        while let Some(node_ptr) = current {
            current = unsafe { node_ptr.as_ref().next };
            if unsafe { node_ptr.as_ref() }.is_expired(now) {
                drop(self.unlink(node_ptr));
                dropped += 1;
            }
        }

        self.validate_invariants();
        dropped
    }

    /// Current number of entries, including not-yet-purged expired ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Configured maximum entry count (`None` = unbounded).
    #[inline]
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Configured time-to-live (`None` = never expire).
    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        while self.pop_tail().is_some() {}
        self.map.clear();

        self.validate_invariants();
    }
}

impl<K, V> Drop for TtlMapCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // Free all nodes by draining the list.
        while self.pop_tail().is_some() {}
    }
}

impl<K, V> fmt::Debug for TtlMapCore<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlMapCore")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Thread-safe TTL + LRU map wrapper.
///
/// `get` takes the write lock: a hit reorders the recency list and an
/// expired hit removes the entry. The wrapper clones cheaply (`Arc` inside)
/// so a map can be shared between an orchestrator and, say, a sweeper task.
pub struct ConcurrentTtlMap<K, V>
where
    K: Eq + Hash + Clone,
{
    inner: Arc<RwLock<TtlMapCore<K, V>>>,
}

impl<K, V> Clone for ConcurrentTtlMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for ConcurrentTtlMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.inner.read();
        f.debug_struct("ConcurrentTtlMap")
            .field("len", &map.len())
            .field("max_size", &map.max_size())
            .field("ttl", &map.ttl())
            .finish_non_exhaustive()
    }
}

impl<K, V> ConcurrentTtlMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a new thread-safe map with the given bounds.
    pub fn new(max_size: Option<usize>, ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TtlMapCore::new(max_size, ttl))),
        }
    }

    /// Inserts a value, wrapping it in an `Arc` internally.
    pub fn insert(&self, key: K, value: V) -> Option<Arc<V>> {
        self.inner.write().insert(key, Arc::new(value))
    }

    /// Inserts a pre-wrapped `Arc<V>`.
    pub fn insert_arc(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.inner.write().insert(key, value)
    }

    /// Expiry-checked lookup; a hit becomes the most recently used entry.
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.write().get(key)
    }

    /// Expiry-checked lookup without recency update.
    pub fn peek<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.read().peek(key)
    }

    /// Expiry-aware existence check.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.read().contains(key)
    }

    /// Removes an entry by key.
    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.write().remove(key)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&self) -> Option<(K, Arc<V>)> {
        self.inner.write().pop_lru()
    }

    /// Eagerly removes expired entries.
    pub fn purge_expired(&self) -> usize {
        self.inner.write().purge_expired()
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Configured maximum entry count.
    pub fn max_size(&self) -> Option<usize> {
        self.inner.read().max_size()
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Option<Duration> {
        self.inner.read().ttl()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.inner.write().clear()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const SHORT_TTL: Duration = Duration::from_millis(40);

    fn core(max_size: Option<usize>, ttl: Option<Duration>) -> TtlMapCore<String, i32> {
        TtlMapCore::new(max_size, ttl)
    }

    #[test]
    fn absent_key_returns_none() {
        let mut map = core(Some(4), None);
        assert_eq!(map.get("missing"), None);
        assert!(!map.contains("missing"));
    }

    #[test]
    fn insert_then_get_returns_value() {
        let mut map = core(Some(4), None);
        assert!(map.insert("a".into(), Arc::new(1)).is_none());
        assert_eq!(map.get("a").as_deref(), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut map = core(Some(4), None);
        map.insert("a".into(), Arc::new(1));
        let prev = map.insert("a".into(), Arc::new(2));
        assert_eq!(prev.as_deref(), Some(&1));
        assert_eq!(map.get("a").as_deref(), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn expired_entry_behaves_as_absent_and_is_removed() {
        let mut map = core(None, Some(SHORT_TTL));
        map.insert("a".into(), Arc::new(1));
        assert_eq!(map.get("a").as_deref(), Some(&1));

        thread::sleep(SHORT_TTL + Duration::from_millis(20));
        assert_eq!(map.get("a"), None);
        // The expired entry was removed as a side effect of the read.
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn peek_does_not_remove_expired_entry() {
        let mut map = core(None, Some(SHORT_TTL));
        map.insert("a".into(), Arc::new(1));
        thread::sleep(SHORT_TTL + Duration::from_millis(20));

        assert_eq!(map.peek("a"), None);
        assert!(!map.contains("a"));
        // Still occupies a slot until a get or purge touches it.
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn replacement_resets_expiry() {
        let mut map = core(None, Some(SHORT_TTL));
        map.insert("a".into(), Arc::new(1));
        thread::sleep(SHORT_TTL / 2);
        map.insert("a".into(), Arc::new(2));
        thread::sleep(SHORT_TTL / 2 + Duration::from_millis(5));

        // The first insertion's deadline has passed, the second's has not.
        assert_eq!(map.get("a").as_deref(), Some(&2));
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let mut map = core(Some(2), None);
        map.insert("a".into(), Arc::new(1));
        map.insert("b".into(), Arc::new(2));
        map.insert("c".into(), Arc::new(3));

        assert_eq!(map.len(), 2);
        assert!(!map.contains("a"));
        assert!(map.contains("b"));
        assert!(map.contains("c"));
    }

    #[test]
    fn get_promotes_entry_out_of_eviction_order() {
        let mut map = core(Some(2), None);
        map.insert("a".into(), Arc::new(1));
        map.insert("b".into(), Arc::new(2));

        // Touch "a" so "b" becomes the LRU victim.
        assert!(map.get("a").is_some());
        map.insert("c".into(), Arc::new(3));

        assert!(map.contains("a"));
        assert!(!map.contains("b"));
        assert!(map.contains("c"));
    }

    #[test]
    fn peek_does_not_promote() {
        let mut map = core(Some(2), None);
        map.insert("a".into(), Arc::new(1));
        map.insert("b".into(), Arc::new(2));

        assert!(map.peek("a").is_some());
        map.insert("c".into(), Arc::new(3));

        // "a" stayed at the tail despite the peek.
        assert!(!map.contains("a"));
    }

    #[test]
    fn unbounded_map_never_evicts() {
        let mut map = core(None, None);
        for i in 0..1000 {
            map.insert(format!("k{i}"), Arc::new(i));
        }
        assert_eq!(map.len(), 1000);
        assert_eq!(map.get("k0").as_deref(), Some(&0));
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut map = core(Some(0), None);
        assert!(map.insert("a".into(), Arc::new(1)).is_none());
        assert_eq!(map.len(), 0);
        assert_eq!(map.get("a"), None);
    }

    #[test]
    fn remove_and_pop_lru() {
        let mut map = core(Some(4), None);
        map.insert("a".into(), Arc::new(1));
        map.insert("b".into(), Arc::new(2));

        assert_eq!(map.remove("a").as_deref(), Some(&1));
        assert_eq!(map.remove("a"), None);

        let (key, value) = map.pop_lru().unwrap();
        assert_eq!(key, "b");
        assert_eq!(*value, 2);
        assert!(map.is_empty());
    }

    #[test]
    fn purge_expired_drops_exactly_the_expired_entries() {
        let mut map = core(None, Some(SHORT_TTL));
        map.insert("old1".into(), Arc::new(1));
        map.insert("old2".into(), Arc::new(2));
        thread::sleep(SHORT_TTL + Duration::from_millis(20));
        map.insert("fresh".into(), Arc::new(3));

        assert_eq!(map.purge_expired(), 2);
        assert_eq!(map.len(), 1);
        assert!(map.contains("fresh"));
    }

    #[test]
    fn clear_empties_the_map() {
        let mut map = core(Some(4), None);
        map.insert("a".into(), Arc::new(1));
        map.insert("b".into(), Arc::new(2));
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.get("a"), None);
    }

    #[test]
    fn value_handle_survives_eviction() {
        let mut map: TtlMapCore<String, String> = TtlMapCore::new(Some(1), None);
        map.insert("a".into(), Arc::new(String::from("payload")));
        let handle = map.get("a").unwrap();

        map.insert("b".into(), Arc::new(String::from("other")));
        assert!(!map.contains("a"));
        // Caller's Arc keeps the evicted value alive.
        assert_eq!(*handle, "payload");
    }

    #[test]
    fn concurrent_map_cross_key_inserts() {
        let map: ConcurrentTtlMap<String, u64> = ConcurrentTtlMap::new(Some(512), None);
        let threads = 8;
        let per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let map = map.clone();
                thread::spawn(move || {
                    for i in 0..per_thread {
                        let key = format!("t{t}_k{i}");
                        map.insert(key.clone(), (t * per_thread + i) as u64);
                        assert!(map.get(key.as_str()).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.len(), (threads * per_thread) as usize);
    }

    #[test]
    fn concurrent_map_respects_capacity_under_contention() {
        let map: ConcurrentTtlMap<String, u64> = ConcurrentTtlMap::new(Some(64), None);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let map = map.clone();
                thread::spawn(move || {
                    for i in 0..200u64 {
                        map.insert(format!("t{t}_k{i}"), i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(map.len() <= 64);
    }
}
