//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with an optional deadline.

use std::time::{Duration, Instant};

use bytes::Bytes;

// == Cache Entry ==
/// Represents a single cache entry with its key, value and deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key this entry is indexed under
    pub key: String,
    /// The stored value
    pub value: Bytes,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry whose deadline is fixed at creation time.
    ///
    /// # Arguments
    /// * `key` - The key of the entry
    /// * `value` - The value to store
    /// * `ttl` - Optional time to live, None = never expires
    ///
    /// A ttl too large to represent as an instant also never expires.
    pub fn new(key: String, value: Bytes, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));

        Self {
            key,
            value,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches the deadline,
    /// so it is only served while `now < expires_at`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}
