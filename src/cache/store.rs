//! Cache Store Module
//!
//! Unsynchronized cache engine combining a key index with the LRU arena and
//! lazy TTL expiration. [`crate::cache::Cache`] wraps it in a lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;

use crate::cache::{CacheEntry, CacheStats, LruList};

// == Cache Store ==
/// Cache storage with LRU eviction and lazy TTL expiration.
#[derive(Debug)]
pub struct CacheStore {
    /// Key to arena slot
    index: HashMap<String, usize>,
    /// Entries in recency order
    order: LruList,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries, 0 = unbounded
    capacity: usize,
    /// Lifetime of an entry from first insertion, None = never expires
    ttl: Option<Duration>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, 0 disables the limit
    /// * `ttl_seconds` - Entry lifetime in seconds, 0 disables expiration
    pub fn new(capacity: usize, ttl_seconds: u64) -> Self {
        let ttl = (ttl_seconds > 0).then(|| Duration::from_secs(ttl_seconds));

        Self {
            index: HashMap::new(),
            order: LruList::new(),
            stats: CacheStats::new(),
            capacity,
            ttl,
        }
    }

    // == Set ==
    /// Stores a value under `key`.
    ///
    /// An existing key has its value replaced and becomes most recently used;
    /// its original deadline is kept. A new key gets a deadline of now + ttl
    /// and, if the store then exceeds its capacity, the least recently used
    /// entry is evicted.
    pub fn set(&mut self, key: &str, value: Bytes) {
        if let Some(&idx) = self.index.get(key) {
            self.order.move_to_front(idx);
            if let Some(entry) = self.order.get_mut(idx) {
                entry.value = value;
            }
            return;
        }

        let entry = CacheEntry::new(key.to_string(), value, self.ttl);
        let idx = self.order.push_front(entry);
        self.index.insert(key.to_string(), idx);

        if self.capacity != 0 && self.order.len() > self.capacity {
            self.evict_lru();
        }
        self.stats.set_total_entries(self.order.len());
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A live entry becomes most recently used. An entry whose deadline has
    /// passed is removed and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        self.get_at(key, Instant::now())
    }

    /// [`CacheStore::get`] evaluated at a given instant.
    pub(crate) fn get_at(&mut self, key: &str, now: Instant) -> Option<Bytes> {
        let Some(&idx) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        let expired = self
            .order
            .get(idx)
            .map_or(true, |entry| self.ttl.is_some() && entry.is_expired_at(now));

        if expired {
            self.remove_slot(key, idx);
            self.stats.record_expiration();
            self.stats.record_miss();
            trace!(key, "Expired entry removed on read");
            return None;
        }

        self.order.move_to_front(idx);
        self.stats.record_hit();
        self.order.get(idx).map(|entry| entry.value.clone())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.order.len());
        stats
    }

    // == Introspection ==
    /// Returns the number of resident entries, expired-but-unread included.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Returns true if `key` is resident, without touching its recency.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Returns resident keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().map(|entry| entry.key.clone()).collect()
    }

    // == Internals ==
    fn evict_lru(&mut self) {
        if let Some(evicted) = self.order.pop_back() {
            self.index.remove(&evicted.key);
            self.stats.record_eviction();
            trace!(key = %evicted.key, "Evicted least recently used entry");
        }
    }

    fn remove_slot(&mut self, key: &str, idx: usize) {
        self.order.remove(idx);
        self.index.remove(key);
        self.stats.set_total_entries(self.order.len());
    }

    /// Asserts that the index and the recency list describe the same key set.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let listed = self.keys();
        assert_eq!(listed.len(), self.index.len(), "index/list size mismatch");
        for key in &listed {
            let idx = self.index[key];
            assert_eq!(&self.order.get(idx).unwrap().key, key);
        }
        if self.capacity != 0 {
            assert!(listed.len() <= self.capacity, "capacity exceeded");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn v(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, 300);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
        assert_eq!(store.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(CacheStore::new(0, 0).ttl(), None);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1", v("value1"));

        assert_eq!(store.get("key1"), Some(v("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(0, 0);
        assert_eq!(store.get("never-set"), None);
    }

    #[test]
    fn test_store_empty_value_and_empty_key() {
        let mut store = CacheStore::new(10, 0);

        store.set("", Bytes::new());

        assert_eq!(store.get(""), Some(Bytes::new()));
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(2, 300);

        store.set("key1", v("value1"));
        store.set("key1", v("value2"));

        assert_eq!(store.get("key1"), Some(v("value2")));
        assert_eq!(store.len(), 1);

        // A second distinct key still fits: the overwrite did not count twice
        store.set("key2", v("value3"));
        assert!(store.contains_key("key1"));
        assert!(store.contains_key("key2"));
        store.assert_consistent();
    }

    #[test]
    fn test_store_capacity_evicts_first_inserted() {
        let mut store = CacheStore::new(3, 0);

        for key in ["key1", "key2", "key3", "key4"] {
            store.set(key, v(key));
        }

        assert_eq!(store.len(), 3);
        assert!(!store.contains_key("key1"));
        assert_eq!(store.keys(), vec!["key4", "key3", "key2"]);
        assert_eq!(store.stats().evictions, 1);
        store.assert_consistent();
    }

    #[test]
    fn test_store_get_promotes_recency() {
        let mut store = CacheStore::new(2, 0);

        store.set("a", v("1"));
        store.set("b", v("2"));
        store.get("a");
        store.set("c", v("3"));

        assert!(store.contains_key("a"));
        assert!(!store.contains_key("b"));
        assert!(store.contains_key("c"));
    }

    #[test]
    fn test_store_set_promotes_recency() {
        let mut store = CacheStore::new(2, 0);

        store.set("a", v("1"));
        store.set("b", v("2"));
        store.set("a", v("1b"));
        store.set("c", v("3"));

        assert!(store.contains_key("a"));
        assert!(!store.contains_key("b"));
    }

    #[test]
    fn test_store_unbounded() {
        let mut store = CacheStore::new(0, 0);

        for i in 0..10_000 {
            store.set(&format!("key{i}"), v("x"));
        }

        assert_eq!(store.len(), 10_000);
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.keys().last().map(String::as_str), Some("key0"));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(1, 1);

        store.set("key1", v("value1"));
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1"), None);
        assert_eq!(store.get("key1"), None);
        assert!(store.is_empty(), "Expired entry should be removed, not flagged");

        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 2);
        store.assert_consistent();
    }

    #[test]
    fn test_store_zero_ttl_never_expires() {
        let mut store = CacheStore::new(10, 0);

        store.set("key", v("value"));
        let far_future = Instant::now() + Duration::from_secs(10 * 365 * 24 * 3600);

        assert_eq!(store.get_at("key", far_future), Some(v("value")));
    }

    #[test]
    fn test_store_huge_ttl_behaves_as_no_expiry() {
        let mut store = CacheStore::new(10, u64::MAX);

        store.set("key", v("value"));
        store.set("key", v("value2"));
        let far_future = Instant::now() + Duration::from_secs(10 * 365 * 24 * 3600);

        assert_eq!(store.get_at("key", far_future), Some(v("value2")));
        assert_eq!(store.stats().expirations, 0);
        store.assert_consistent();
    }

    #[test]
    fn test_store_deadline_boundary() {
        let mut store = CacheStore::new(10, 5);

        store.set("key", v("value"));
        let deadline = store.order.back().unwrap().expires_at.unwrap();

        assert!(store.get_at("key", deadline - Duration::from_millis(1)).is_some());
        assert!(store.get_at("key", deadline).is_none());
    }

    #[test]
    fn test_store_overwrite_keeps_original_deadline() {
        let mut store = CacheStore::new(10, 5);

        store.set("key", v("old"));
        let deadline = store.order.back().unwrap().expires_at.unwrap();

        sleep(Duration::from_millis(20));
        store.set("key", v("new"));

        let after_overwrite = store.order.back().unwrap().expires_at.unwrap();
        assert_eq!(after_overwrite, deadline);
        assert_eq!(store.get_at("key", deadline), None);
    }

    #[test]
    fn test_store_expired_entries_hold_capacity_until_read() {
        let mut store = CacheStore::new(2, 1);

        store.set("stale", v("1"));
        sleep(Duration::from_millis(1100));

        // Not read yet, so still resident and still the eviction candidate
        assert_eq!(store.len(), 1);
        store.set("fresh1", v("2"));
        store.set("fresh2", v("3"));

        assert!(!store.contains_key("stale"));
        assert_eq!(store.stats().evictions, 1);
        assert_eq!(store.stats().expirations, 0);
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1", v("value1"));
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
