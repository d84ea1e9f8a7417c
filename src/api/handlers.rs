//! API Handlers
//!
//! Application state, the operations it exposes, and the HTTP handlers
//! built on them.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info};

use crate::cache;
use crate::config::Config;
use crate::coordinator::{FetchCoordinator, Resolution};
use crate::error::{ProxyError, Result};
use crate::fetcher::Fetcher;
use crate::models::{
    BlocklistRequest, BlocklistResponse, CacheListing, FetchAccepted, FetchQuery, FetchRequest,
    HealthResponse, PolicyChanged, PolicyRequest, SchedulerResponse, SimulateRequest,
    SimulateResponse, StatsResponse,
};
use crate::scheduler::{timeline, Admission, AdmissionScheduler, Policy};
use crate::validator::Validator;

/// Application state shared across all handlers.
///
/// Every component is process-scoped and shared by reference; cloning the
/// state clones handles, not data.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: FetchCoordinator,
    pub scheduler: Arc<AdmissionScheduler>,
    pub validator: Arc<Validator>,
    pub fetcher: Arc<dyn Fetcher>,
    pub fetch_timeout: Duration,
}

impl AppState {
    /// Creates a new AppState from configuration.
    ///
    /// # Arguments
    /// * `config` - Capacity, timeouts and initial blocklist
    /// * `fetcher` - Origin fetcher used for every cache miss
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            coordinator: FetchCoordinator::new(
                cache::shared(config.cache_capacity_bytes),
                config.waiter_timeout(),
            ),
            scheduler: Arc::new(AdmissionScheduler::default()),
            validator: Arc::new(Validator::new(&config.blocklist)),
            fetcher,
            fetch_timeout: config.fetch_timeout(),
        }
    }

    // == Submit Fetch ==
    /// Validates `url` and queues it under the active policy.
    ///
    /// Returns an acknowledgement only; the worker that eventually runs the
    /// job consumes the result.
    pub fn submit_fetch(&self, url: &str) -> Result<Admission> {
        self.validator.is_allowed(url)?;
        Ok(self.scheduler.submit(url))
    }

    // == Fetch Now ==
    /// Validates `url` and resolves it immediately, bypassing the scheduler.
    pub async fn fetch_now(&self, url: &str) -> Result<Resolution> {
        self.validator.is_allowed(url)?;
        Ok(self
            .coordinator
            .resolve_with(url, Arc::clone(&self.fetcher), self.fetch_timeout)
            .await)
    }

    // == Stats ==
    /// Cache, coordinator and queue counters in one snapshot.
    pub fn stats(&self) -> StatsResponse {
        StatsResponse::new(
            self.coordinator.cache_stats(),
            self.coordinator.inflight_stats(),
            self.scheduler.active_policy(),
            self.scheduler.queue_depths(),
        )
    }

    // == Policy ==
    pub fn policy(&self) -> Policy {
        self.scheduler.active_policy()
    }

    /// Parses `name` and makes it the active policy.
    /// Returns the previous and the new policy.
    pub fn set_policy(&self, name: &str) -> Result<(Policy, Policy)> {
        let policy: Policy = name.parse()?;
        let previous = self.scheduler.set_active_policy(policy);
        Ok((previous, policy))
    }
}

/// Unwraps a JSON body, turning extractor rejections into 400s.
fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ProxyError::InvalidRequest(rejection.body_text()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for POST /fetch
///
/// Queues the URL with the active policy and answers 202 right away.
pub async fn submit_fetch_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<FetchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FetchAccepted>)> {
    let url = json_body(body)?
        .validate()
        .map_err(ProxyError::InvalidRequest)?;

    let admission = state.submit_fetch(&url)?;
    Ok((StatusCode::ACCEPTED, Json(admission.into())))
}

/// Handler for GET /fetch?url=
///
/// Serves the origin response, from cache when possible, with
/// `X-Cache-Hit`, `X-Cached` and `X-Coalesced` flags.
pub async fn fetch_now_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Response> {
    let url = query.validate().map_err(ProxyError::InvalidRequest)?;

    let resolution = state.fetch_now(&url).await?;
    let fetched = resolution.outcome.clone()?;
    debug!(url = %url, role = ?resolution.role, "serving synchronous fetch");

    let entry = &fetched.entry;
    let status = StatusCode::from_u16(entry.status)
        .map_err(|e| ProxyError::Upstream(format!("origin sent invalid status: {}", e)))?;

    let mut headers = HeaderMap::new();
    for (name, value) in &entry.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    headers.insert("x-cache-hit", flag(resolution.cache_hit()));
    headers.insert("x-cached", flag(fetched.cached));
    headers.insert("x-coalesced", flag(resolution.waited()));

    Ok((status, headers, entry.body.clone()).into_response())
}

fn flag(set: bool) -> HeaderValue {
    HeaderValue::from_static(if set { "1" } else { "0" })
}

/// Handler for GET /cache
pub async fn cache_handler(State(state): State<AppState>) -> Json<CacheListing> {
    Json(CacheListing {
        items: state.coordinator.list_entries(),
        stats: state.coordinator.cache_stats(),
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.stats())
}

/// Handler for GET /scheduler
pub async fn get_scheduler_handler(State(state): State<AppState>) -> Json<SchedulerResponse> {
    Json(SchedulerResponse::new(
        state.policy(),
        state.scheduler.queue_depths(),
    ))
}

/// Handler for PUT /scheduler
pub async fn set_scheduler_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<PolicyRequest>, JsonRejection>,
) -> Result<Json<PolicyChanged>> {
    let req = json_body(body)?;
    let (previous, current) = state.set_policy(&req.algorithm)?;
    Ok(Json(PolicyChanged::new(previous, current)))
}

/// Handler for POST /scheduler/simulate
///
/// Runs the offline timeline simulator; live queues are untouched.
pub async fn simulate_handler(
    body: std::result::Result<Json<SimulateRequest>, JsonRejection>,
) -> Result<Json<SimulateResponse>> {
    let req = json_body(body)?;
    let algorithm: Policy = req.algorithm.parse()?;
    let timeline = timeline::simulate(algorithm, &req.processes, req.quantum)
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

    let quantum = match algorithm {
        Policy::Rr => Some(req.quantum.unwrap_or(timeline::DEFAULT_QUANTUM)),
        Policy::Fcfs | Policy::Sjf => None,
    };
    Ok(Json(SimulateResponse {
        algorithm,
        quantum,
        timeline,
    }))
}

/// Handler for GET /admin/blocklist
pub async fn blocklist_handler(State(state): State<AppState>) -> Json<BlocklistResponse> {
    Json(BlocklistResponse::listing(state.validator.blocklist()))
}

/// Handler for POST /admin/blocklist
///
/// 201 when the domain was added, 409 when it was already listed.
pub async fn blocklist_add_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<BlocklistRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BlocklistResponse>)> {
    let domain = json_body(body)?
        .validate()
        .map_err(ProxyError::InvalidRequest)?;

    let added = state.validator.add(&domain);
    if added {
        info!(domain = %domain, "domain added to blocklist");
    }
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    };
    Ok((
        status,
        Json(BlocklistResponse::added(added, domain, state.validator.blocklist())),
    ))
}

/// Handler for DELETE /admin/blocklist
///
/// 200 when the domain was removed, 404 when it was not listed.
pub async fn blocklist_remove_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<BlocklistRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BlocklistResponse>)> {
    let domain = json_body(body)?
        .validate()
        .map_err(ProxyError::InvalidRequest)?;

    let removed = state.validator.remove(&domain);
    if removed {
        info!(domain = %domain, "domain removed from blocklist");
    }
    let status = if removed {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((
        status,
        Json(BlocklistResponse::removed(removed, domain, state.validator.blocklist())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StubFetcher;

    fn state() -> (AppState, Arc<StubFetcher>) {
        let fetcher = Arc::new(StubFetcher::default());
        (AppState::from_config(&Config::default(), fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn test_submit_fetch_queues_under_active_policy() {
        let (state, fetcher) = state();

        let admission = state.submit_fetch("http://a/x.css").unwrap();

        assert_eq!(admission.policy, Policy::Fcfs);
        assert_eq!(admission.queue_depth, 1);
        assert_eq!(state.stats().queue_depths.fcfs, 1);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_fetch_rejects_blocked_url() {
        let (state, _) = state();

        let result = state.submit_fetch("https://www.facebook.com/");

        assert!(matches!(result, Err(ProxyError::Forbidden(_))));
        assert_eq!(state.scheduler.queue_depths().fcfs, 0);
    }

    #[tokio::test]
    async fn test_fetch_now_then_hit() {
        let (state, fetcher) = state();

        let first = state.fetch_now("http://a/page.html").await.unwrap();
        let second = state.fetch_now("http://a/page.html").await.unwrap();

        assert!(first.performed_fetch());
        assert!(second.cache_hit());
        assert_eq!(fetcher.calls(), 1);

        let stats = state.stats();
        assert_eq!(stats.cache.hits, 1);
        assert_eq!(stats.inflight.origin_fetches, 1);
    }

    #[tokio::test]
    async fn test_set_policy() {
        let (state, _) = state();

        assert_eq!(state.set_policy("SJF").unwrap(), (Policy::Fcfs, Policy::Sjf));
        assert_eq!(state.policy(), Policy::Sjf);
        assert!(matches!(
            state.set_policy("lottery"),
            Err(ProxyError::InvalidRequest(_))
        ));
        assert_eq!(state.policy(), Policy::Sjf);
    }

    #[tokio::test]
    async fn test_simulate_handler_fills_default_quantum() {
        let req = SimulateRequest {
            algorithm: "rr".to_string(),
            processes: vec![timeline::Process::new("P1", 0, 3)],
            quantum: None,
        };

        let Json(resp) = simulate_handler(Ok(Json(req))).await.unwrap();

        assert_eq!(resp.quantum, Some(timeline::DEFAULT_QUANTUM));
        assert_eq!(resp.timeline.len(), 2);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "ok");
    }
}
