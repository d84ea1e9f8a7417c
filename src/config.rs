//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_CAPACITY_BYTES;
use crate::validator::DEFAULT_BLOCKLIST;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hard byte ceiling of the response cache
    pub cache_capacity_bytes: usize,
    /// Number of fetch workers
    pub worker_count: usize,
    /// Jobs the worker pool buffers before dispatch waits
    pub worker_queue_capacity: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Origin request timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Bound on a coalesced wait in milliseconds, 0 disables it
    pub waiter_timeout_ms: u64,
    /// Dispatcher pause after a failed iteration, in milliseconds
    pub dispatch_backoff_ms: u64,
    /// Initially blocked domains
    pub blocklist: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY_BYTES` - Cache capacity (default: 5 MiB)
    /// - `WORKER_COUNT` - Fetch workers (default: 8)
    /// - `WORKER_QUEUE_CAPACITY` - Worker pool channel size (default: 256)
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `FETCH_TIMEOUT_SECS` - Origin timeout (default: 10)
    /// - `WAITER_TIMEOUT_MS` - Coalesced wait bound, 0 for none (default: 0)
    /// - `DISPATCH_BACKOFF_MS` - Dispatcher retry pause (default: 1000)
    /// - `BLOCKLIST` - Comma-separated blocked domains
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity_bytes: parse_var("CACHE_CAPACITY_BYTES", defaults.cache_capacity_bytes),
            worker_count: parse_var("WORKER_COUNT", defaults.worker_count),
            worker_queue_capacity: parse_var("WORKER_QUEUE_CAPACITY", defaults.worker_queue_capacity),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            fetch_timeout_secs: parse_var("FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            waiter_timeout_ms: parse_var("WAITER_TIMEOUT_MS", defaults.waiter_timeout_ms),
            dispatch_backoff_ms: parse_var("DISPATCH_BACKOFF_MS", defaults.dispatch_backoff_ms),
            blocklist: env::var("BLOCKLIST")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.blocklist),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// `None` when waiters may wait indefinitely.
    pub fn waiter_timeout(&self) -> Option<Duration> {
        (self.waiter_timeout_ms > 0).then(|| Duration::from_millis(self.waiter_timeout_ms))
    }

    pub fn dispatch_backoff(&self) -> Duration {
        Duration::from_millis(self.dispatch_backoff_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity_bytes: DEFAULT_CAPACITY_BYTES,
            worker_count: 8,
            worker_queue_capacity: 256,
            server_port: 8000,
            fetch_timeout_secs: 10,
            waiter_timeout_ms: 0,
            dispatch_backoff_ms: 1000,
            blocklist: DEFAULT_BLOCKLIST.iter().map(|d| d.to_string()).collect(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}
