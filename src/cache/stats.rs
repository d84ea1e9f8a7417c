//! Cache Statistics Module
//!
//! Byte usage and hit/miss/eviction counters for the bounded store.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Hard byte ceiling
    pub capacity_bytes: usize,
    /// Sum of `size` over resident entries
    pub current_usage_bytes: usize,
    /// Number of resident entries
    pub item_count: usize,
    /// Number of `get` calls that found an entry
    pub hits: u64,
    /// Number of `get` calls that found nothing
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates zeroed stats for a store of the given capacity.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            ..Self::default()
        }
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}
