//! Cache Store Module
//!
//! Byte-bounded key-value store with strict LRU eviction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EntrySummary, LruTracker};

// == Cache Store ==
/// Byte-capacity store keyed by URL.
///
/// After every completed mutation the sum of resident entry sizes is at most
/// `capacity_bytes`. The store itself is not synchronized; share it through
/// [`SharedCache`](crate::cache::SharedCache).
#[derive(Debug)]
pub struct CacheStore {
    /// Resident entries
    entries: HashMap<String, Arc<CacheEntry>>,
    /// Recency order
    lru: LruTracker,
    /// Counters
    stats: CacheStats,
    /// Hard byte ceiling
    capacity_bytes: usize,
    /// Sum of resident entry sizes
    current_usage: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store holding at most `capacity_bytes` of bodies.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(capacity_bytes),
            capacity_bytes,
            current_usage: 0,
        }
    }

    // == Get ==
    /// Looks up `key`, refreshing it to most recently used on a hit.
    ///
    /// Every call counts as exactly one hit or one miss.
    pub fn get(&mut self, key: &str) -> Option<Arc<CacheEntry>> {
        match self.entries.get(key) {
            Some(entry) => {
                let entry = Arc::clone(entry);
                self.lru.touch(key);
                self.stats.record_hit();
                Some(entry)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Put ==
    /// Inserts `entry` under `key` as most recently used.
    ///
    /// Returns `false` and leaves the store untouched when the entry alone
    /// exceeds capacity. Otherwise any previous entry for `key` is dropped,
    /// least recently used entries are evicted one at a time until the new
    /// entry fits, and the entry is inserted.
    pub fn put(&mut self, key: impl Into<String>, entry: Arc<CacheEntry>) -> bool {
        if entry.size > self.capacity_bytes {
            return false;
        }
        let key = key.into();

        if let Some(old) = self.entries.remove(&key) {
            self.lru.remove(&key);
            self.current_usage -= old.size;
        }

        while self.current_usage + entry.size > self.capacity_bytes {
            let Some(victim) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&victim) {
                self.current_usage -= evicted.size;
                self.stats.record_eviction();
                debug!(key = %victim, size = evicted.size, "evicted cache entry");
            }
        }

        self.current_usage += entry.size;
        self.lru.touch(&key);
        self.entries.insert(key, entry);
        true
    }

    // == Stats ==
    /// Returns a snapshot of usage and counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            current_usage_bytes: self.current_usage,
            item_count: self.entries.len(),
            ..self.stats.clone()
        }
    }

    // == List Entries ==
    /// Lists resident entries from most to least recently used.
    ///
    /// Listing does not count as access and leaves recency untouched.
    pub fn list_entries(&self) -> Vec<EntrySummary> {
        self.lru
            .iter()
            .filter_map(|key| self.entries.get(key).map(|entry| entry.summary(key)))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn usage_bytes(&self) -> usize {
        self.current_usage
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
