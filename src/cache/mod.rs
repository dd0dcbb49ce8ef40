//! Cache Module
//!
//! Provides a thread-safe in-memory cache with lazy TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;

// Re-export public types
pub(crate) use entry::CacheEntry;
pub(crate) use lru::LruList;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Cache ==
/// Thread-safe cache shared by the front-ends.
///
/// Every operation holds one exclusive lock for its whole duration, so calls
/// are linearizable and the recency order is globally consistent. Nothing is
/// ever awaited while the lock is held.
#[derive(Debug)]
pub struct Cache {
    inner: Mutex<CacheStore>,
}

impl Cache {
    /// Creates an empty cache.
    ///
    /// `capacity = 0` disables the size limit and `ttl_seconds = 0` disables
    /// expiration.
    pub fn new(capacity: usize, ttl_seconds: u64) -> Self {
        Self {
            inner: Mutex::new(CacheStore::new(capacity, ttl_seconds)),
        }
    }

    /// Adds or updates `key`, possibly evicting the least recently used entry.
    ///
    /// Updating an existing key does not extend its expiration deadline.
    pub fn set(&self, key: &str, value: impl Into<Bytes>) {
        self.lock().set(key, value.into());
    }

    /// Returns the value for `key` if it is present and not expired.
    ///
    /// Never-cached, evicted and expired keys all read as `None`.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lock().get(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.lock().ttl()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    // A panic elsewhere cannot leave the store half-updated across the two
    // structures, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut CacheStore) -> R) -> R {
        f(&mut *self.lock())
    }
}
