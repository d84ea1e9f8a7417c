//! Response DTOs for the proxy API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, EntrySummary};
use crate::coordinator::CoordinatorStats;
use crate::scheduler::timeline::Slice;
use crate::scheduler::{Admission, Policy, QueueDepths};

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
            service: "SwiftCache".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for a queued fetch (POST /fetch)
#[derive(Debug, Clone, Serialize)]
pub struct FetchAccepted {
    pub message: String,
    /// Policy whose queue took the job
    pub scheduler: Policy,
    pub queue_size: usize,
}

impl From<Admission> for FetchAccepted {
    fn from(admission: Admission) -> Self {
        Self {
            message: format!(
                "Request queued with {} policy",
                admission.policy.as_str().to_uppercase()
            ),
            scheduler: admission.policy,
            queue_size: admission.queue_depth,
        }
    }
}

/// Response body for the cache listing (GET /cache)
#[derive(Debug, Clone, Serialize)]
pub struct CacheListing {
    /// Resident entries, most recently used first
    pub items: Vec<EntrySummary>,
    pub stats: CacheStats,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    #[serde(flatten)]
    pub inflight: CoordinatorStats,
    pub active_policy: Policy,
    pub queue_depths: QueueDepths,
}

impl StatsResponse {
    pub fn new(
        cache: CacheStats,
        inflight: CoordinatorStats,
        active_policy: Policy,
        queue_depths: QueueDepths,
    ) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            inflight,
            active_policy,
            queue_depths,
        }
    }
}

/// Response body for GET /scheduler
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerResponse {
    pub current_algorithm: Policy,
    pub available: Vec<Policy>,
    pub queue_depths: QueueDepths,
}

impl SchedulerResponse {
    pub fn new(current: Policy, queue_depths: QueueDepths) -> Self {
        Self {
            current_algorithm: current,
            available: Policy::ALL.to_vec(),
            queue_depths,
        }
    }
}

/// Response body for PUT /scheduler
#[derive(Debug, Clone, Serialize)]
pub struct PolicyChanged {
    pub message: String,
    pub previous_algorithm: Policy,
    pub current_algorithm: Policy,
}

impl PolicyChanged {
    pub fn new(previous: Policy, current: Policy) -> Self {
        Self {
            message: format!("Scheduler changed to {}", current.as_str().to_uppercase()),
            previous_algorithm: previous,
            current_algorithm: current,
        }
    }
}

/// Response body for the blocklist endpoints
#[derive(Debug, Clone, Serialize)]
pub struct BlocklistResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub blocklist: Vec<String>,
}

impl BlocklistResponse {
    pub fn listing(blocklist: Vec<String>) -> Self {
        Self {
            added: None,
            removed: None,
            domain: None,
            blocklist,
        }
    }

    pub fn added(added: bool, domain: impl Into<String>, blocklist: Vec<String>) -> Self {
        Self {
            added: Some(added),
            domain: Some(domain.into()),
            ..Self::listing(blocklist)
        }
    }

    pub fn removed(removed: bool, domain: impl Into<String>, blocklist: Vec<String>) -> Self {
        Self {
            removed: Some(removed),
            domain: Some(domain.into()),
            ..Self::listing(blocklist)
        }
    }
}

/// Response body for POST /scheduler/simulate
#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub algorithm: Policy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantum: Option<u64>,
    pub timeline: Vec<Slice>,
}
