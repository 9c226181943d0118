//! Storage backends for the memoization cache.

pub mod ttl_map;
