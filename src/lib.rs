//! SwiftCache - A caching fetch proxy
//!
//! Byte-bounded LRU response cache, request coalescing for concurrent misses,
//! and a live-switchable admission scheduler feeding a fixed worker pool.

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod scheduler;
pub mod tasks;
pub mod validator;

pub use api::{create_router, AppState};
pub use cache::{CacheEntry, CacheStore, SharedCache};
pub use config::Config;
pub use coordinator::{FetchCoordinator, Resolution, ResolveError, Role};
pub use error::ProxyError;
pub use fetcher::{FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use scheduler::{AdmissionScheduler, Policy};
pub use tasks::{spawn_dispatcher, WorkerPool};
pub use validator::Validator;
