//! Cache Entry Module
//!
//! Defines the immutable record stored for each fetched resource.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;

// == Cache Entry ==
/// A fetched origin response, frozen at creation time.
///
/// Entries are shared as `Arc<CacheEntry>` between the store and every caller
/// that observed the same fetch, so they are never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Origin status code
    pub status: u16,
    /// Response headers, already filtered of hop-by-hop fields
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Bytes,
    /// Size in bytes, always equal to `body.len()`
    pub size: usize,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    ///
    /// # Arguments
    /// * `status` - Origin status code
    /// * `headers` - Response headers to replay on hits
    /// * `body` - Response body; its length becomes the accounted size
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            headers,
            size: body.len(),
            body,
            created_at: current_timestamp_ms(),
        }
    }

    // == Is Cacheable ==
    /// Only 2xx and 3xx responses are admitted into the store.
    pub fn is_cacheable(&self) -> bool {
        (200..400).contains(&self.status)
    }

    // == Summary ==
    /// Returns the listing view of this entry under `key`.
    pub fn summary(&self, key: &str) -> EntrySummary {
        EntrySummary {
            key: key.to_string(),
            size: self.size,
            created_at: self.created_at,
        }
    }
}

// == Entry Summary ==
/// Listing row returned by `CacheStore::list_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub key: String,
    pub size: usize,
    pub created_at: u64,
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_size_matches_body() {
        let entry = CacheEntry::new(200, BTreeMap::new(), vec![0u8; 42]);

        assert_eq!(entry.size, 42);
        assert_eq!(entry.body.len(), entry.size);
    }

    #[test]
    fn test_entry_created_at_is_recent() {
        let before = current_timestamp_ms();
        let entry = CacheEntry::new(200, BTreeMap::new(), "hello");
        let after = current_timestamp_ms();

        assert!(entry.created_at >= before);
        assert!(entry.created_at <= after);
    }

    #[test]
    fn test_cacheable_status_range() {
        let entry = |status| CacheEntry::new(status, BTreeMap::new(), "");

        assert!(!entry(199).is_cacheable());
        assert!(entry(200).is_cacheable());
        assert!(entry(304).is_cacheable());
        assert!(entry(399).is_cacheable());
        assert!(!entry(404).is_cacheable());
        assert!(!entry(500).is_cacheable());
    }

    #[test]
    fn test_summary_carries_key_and_size() {
        let entry = CacheEntry::new(200, BTreeMap::new(), "abc");
        let summary = entry.summary("http://a/x.css");

        assert_eq!(summary.key, "http://a/x.css");
        assert_eq!(summary.size, 3);
        assert_eq!(summary.created_at, entry.created_at);
    }
}
