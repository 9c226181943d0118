//! Error types for the memokit library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero capacity, zero TTL, zero lock timeout).
//!
//! Computation failures are never wrapped: `get_or_compute` propagates the
//! caller's own error type verbatim and stores nothing.
//!
//! ## Example Usage
//!
//! ```
//! use memokit::builder::CacheBuilder;
//! use memokit::error::ConfigError;
//!
//! // Fallible constructor for user-configurable parameters
//! let cache = CacheBuilder::new().max_size(100).try_build::<String>();
//! assert!(cache.is_ok());
//!
//! // Invalid capacity is caught without panicking
//! let bad = CacheBuilder::new().max_size(0).try_build::<String>();
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by the fallible builder methods
/// [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build) and
/// [`CacheBuilder::try_build_async`](crate::builder::CacheBuilder::try_build_async).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use memokit::builder::CacheBuilder;
///
/// let err = CacheBuilder::new().max_size(0).try_build::<u64>().unwrap_err();
/// assert!(err.to_string().contains("max_size"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
