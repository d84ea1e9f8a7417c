//! API Routes
//!
//! Configures the Axum router with all proxy server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    blocklist_add_handler, blocklist_handler, blocklist_remove_handler, cache_handler,
    fetch_now_handler, get_scheduler_handler, health_handler, set_scheduler_handler,
    simulate_handler, stats_handler, submit_fetch_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `POST /fetch` - Queue a URL under the active policy
/// - `GET /fetch?url=` - Fetch synchronously through the cache
/// - `GET /cache` - Cache contents and statistics
/// - `GET /stats` - Cache, coalescing and queue statistics
/// - `GET|PUT /scheduler` - Read or switch the active policy
/// - `POST /scheduler/simulate` - Offline scheduling timeline
/// - `GET|POST|DELETE /admin/blocklist` - Manage blocked domains
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/fetch", post(submit_fetch_handler).get(fetch_now_handler))
        .route("/cache", get(cache_handler))
        .route("/stats", get(stats_handler))
        .route(
            "/scheduler",
            get(get_scheduler_handler).put(set_scheduler_handler),
        )
        .route("/scheduler/simulate", post(simulate_handler))
        .route(
            "/admin/blocklist",
            get(blocklist_handler)
                .post(blocklist_add_handler)
                .delete(blocklist_remove_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fetcher::testing::StubFetcher;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let state = AppState::from_config(&Config::default(), Arc::new(StubFetcher::default()));
        create_router(state)
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_fetch_accepted() {
        let app = create_test_app();

        let response = app
            .oneshot(json_request("POST", "/fetch", r#"{"url":"http://a/x.css"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_submit_fetch_missing_url() {
        let app = create_test_app();

        let response = app
            .oneshot(json_request("POST", "/fetch", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_fetch_blocked() {
        let app = create_test_app();

        let response = app
            .oneshot(json_request("POST", "/fetch", r#"{"url":"http://facebook.com/"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_policy_rejected() {
        let app = create_test_app();

        let response = app
            .oneshot(json_request("PUT", "/scheduler", r#"{"algorithm":"lottery"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fetch_now_missing_url() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/fetch").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
