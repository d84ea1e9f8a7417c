//! Cache Module
//!
//! Byte-capacity store with strict LRU eviction. Knows nothing about
//! request coalescing; see [`crate::coordinator`] for that layer.

mod entry;
mod lru;
mod stats;
mod store;


use std::sync::Arc;

use parking_lot::Mutex;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, EntrySummary};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

/// The store behind its single global lock, shared by every worker.
pub type SharedCache = Arc<Mutex<CacheStore>>;

// == Public Constants ==
/// Default store capacity in bytes
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024; // 5 MB

/// Wraps a fresh store of `capacity_bytes` for sharing.
pub fn shared(capacity_bytes: usize) -> SharedCache {
    Arc::new(Mutex::new(CacheStore::new(capacity_bytes)))
}
