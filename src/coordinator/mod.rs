//! Fetch Coordinator Module
//!
//! Request coalescing over the bounded cache: for any key at most one
//! producer fetch runs at a time, and every concurrent caller for that key
//! observes the producer's outcome.

mod inflight;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, EntrySummary, SharedCache};
use crate::fetcher::{FetchError, FetchResponse, Fetcher};
use inflight::{EpochGuard, InflightRegistry, Join, OutcomeRx, SharedRegistry};

// == Resolve Error ==
/// Why a resolve produced no entry.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The producer's fetch failed; every caller of the epoch shares this value
    #[error("upstream fetch failed: {0}")]
    Upstream(Arc<FetchError>),

    /// A waiter stopped waiting before the producer finished
    #[error("timed out after {0:?} waiting for in-flight fetch")]
    WaitTimedOut(Duration),

    /// The producer ended without publishing an outcome
    #[error("coordinator invariant violated: {0}")]
    Internal(String),
}

// == Fetched ==
/// A producer's successful result.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub entry: Arc<CacheEntry>,
    /// Whether the entry was admitted into the store
    pub cached: bool,
}

/// What a producer publishes to its epoch.
pub type Outcome = Result<Fetched, ResolveError>;

// == Role ==
/// How a caller took part in a resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Served from the store without coordination
    CacheHit,
    /// Ran the fetch for this epoch
    Owner,
    /// Waited on another caller's fetch
    Waiter,
}

// == Resolution ==
#[derive(Debug, Clone)]
pub struct Resolution {
    pub role: Role,
    pub outcome: Outcome,
}

impl Resolution {
    pub fn performed_fetch(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn waited(&self) -> bool {
        self.role == Role::Waiter
    }

    pub fn cache_hit(&self) -> bool {
        self.role == Role::CacheHit
    }

    pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
        self.outcome.as_ref().ok().map(|fetched| &fetched.entry)
    }

    pub fn error(&self) -> Option<&ResolveError> {
        self.outcome.as_ref().err()
    }
}

// == Coordinator Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Records currently in the registry
    pub inflight_requests: usize,
    /// Epochs started, i.e. origin fetches attempted
    pub origin_fetches: u64,
    /// Callers that joined someone else's epoch
    pub coalesced_waits: u64,
}

// == Fetch Coordinator ==
/// Singleflight coordinator layered over the shared store.
///
/// The store lock and the registry lock are independent, and neither is
/// held while a fetch runs. Cloning shares the same store and registry.
#[derive(Clone)]
pub struct FetchCoordinator {
    cache: SharedCache,
    registry: SharedRegistry,
    waiter_timeout: Option<Duration>,
    origin_fetches: Arc<AtomicU64>,
    coalesced_waits: Arc<AtomicU64>,
}

impl FetchCoordinator {
    // == Constructor ==
    /// Creates a coordinator over `cache`.
    ///
    /// # Arguments
    /// * `cache` - Shared bounded store
    /// * `waiter_timeout` - Optional bound on how long a waiter blocks
    pub fn new(cache: SharedCache, waiter_timeout: Option<Duration>) -> Self {
        Self {
            cache,
            registry: Arc::new(parking_lot::Mutex::new(InflightRegistry::default())),
            waiter_timeout,
            origin_fetches: Arc::new(AtomicU64::new(0)),
            coalesced_waits: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    // == Resolve ==
    /// Returns the entry for `key`, fetching it with `fetch_fn` if needed.
    ///
    /// A store hit returns immediately. Otherwise the first caller for the
    /// key becomes the owner and `fetch_fn` is invoked once; callers arriving
    /// while it runs wait for the same outcome. The fetch runs in its own
    /// task, so it completes, fills the store and releases waiters even if
    /// the owner's caller is dropped. `fetch_fn` is never called by waiters.
    pub async fn resolve<F, Fut>(&self, key: &str, fetch_fn: F) -> Resolution
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<FetchResponse, FetchError>> + Send + 'static,
    {
        let hit = self.cache.lock().get(key);
        if let Some(entry) = hit {
            debug!(key, "cache hit");
            return Resolution {
                role: Role::CacheHit,
                outcome: Ok(Fetched {
                    entry,
                    cached: true,
                }),
            };
        }

        match inflight::join(&self.registry, key) {
            Join::Waiter(rx) => {
                self.coalesced_waits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "joining in-flight fetch");
                Resolution {
                    role: Role::Waiter,
                    outcome: await_outcome(rx, self.waiter_timeout).await,
                }
            }
            Join::Owner(epoch, rx) => {
                self.origin_fetches.fetch_add(1, Ordering::Relaxed);
                tokio::spawn(produce(Arc::clone(&self.cache), epoch, fetch_fn));
                Resolution {
                    role: Role::Owner,
                    outcome: await_outcome(rx, None).await,
                }
            }
        }
    }

    /// Resolves `url` with `fetcher` as the producer.
    pub async fn resolve_with(
        &self,
        url: &str,
        fetcher: Arc<dyn Fetcher>,
        timeout: Duration,
    ) -> Resolution {
        let target = url.to_string();
        self.resolve(url, move || async move { fetcher.fetch(&target, timeout).await })
            .await
    }

    // == Stats ==
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn inflight_stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            inflight_requests: self.registry.lock().len(),
            origin_fetches: self.origin_fetches.load(Ordering::Relaxed),
            coalesced_waits: self.coalesced_waits.load(Ordering::Relaxed),
        }
    }

    pub fn list_entries(&self) -> Vec<EntrySummary> {
        self.cache.lock().list_entries()
    }
}

/// Runs one epoch: fetch, fill the store on success, publish.
async fn produce<F, Fut>(cache: SharedCache, epoch: EpochGuard, fetch_fn: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<FetchResponse, FetchError>>,
{
    let key = epoch.key().to_string();

    let outcome = match fetch_fn().await {
        Ok(response) => {
            let entry = Arc::new(CacheEntry::new(
                response.status,
                response.headers,
                response.body,
            ));
            let cached = if entry.is_cacheable() {
                let admitted = cache.lock().put(key.clone(), Arc::clone(&entry));
                if admitted {
                    info!(key = %key, size = entry.size, "stored response in cache");
                } else {
                    warn!(key = %key, size = entry.size, "response larger than cache capacity, not stored");
                }
                admitted
            } else {
                info!(key = %key, status = entry.status, "not caching unsuccessful response");
                false
            };
            Ok(Fetched { entry, cached })
        }
        Err(e) => {
            warn!(key = %key, error = %e, "origin fetch failed");
            Err(ResolveError::Upstream(Arc::new(e)))
        }
    };

    epoch.publish(outcome);
}

/// Blocks until the epoch publishes, optionally bounded by `limit`.
async fn await_outcome(mut rx: OutcomeRx, limit: Option<Duration>) -> Outcome {
    let wait = async move {
        match rx.wait_for(Option::is_some).await {
            Ok(published) => match &*published {
                Some(outcome) => outcome.clone(),
                None => Err(ResolveError::Internal(
                    "epoch released without an outcome".to_string(),
                )),
            },
            Err(_) => Err(ResolveError::Internal(
                "producer exited without publishing an outcome".to_string(),
            )),
        }
    };

    match limit {
        Some(limit) => tokio::time::timeout(limit, wait)
            .await
            .unwrap_or(Err(ResolveError::WaitTimedOut(limit))),
        None => wait.await,
    }
}
