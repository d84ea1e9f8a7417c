//! Error types for the proxy server
//!
//! Provides unified HTTP-facing error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::coordinator::ResolveError;
use crate::scheduler::PolicyError;
use crate::validator::ValidationError;

// == Proxy Error Enum ==
/// Unified error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Missing or malformed request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// URL on the blocklist
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Origin fetch failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Gave up waiting on an in-flight fetch
    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Forbidden(_) => StatusCode::FORBIDDEN,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == Conversions ==
impl From<ValidationError> for ProxyError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingHost => ProxyError::InvalidRequest(err.to_string()),
            ValidationError::Blocked(_) => ProxyError::Forbidden(err.to_string()),
        }
    }
}

impl From<PolicyError> for ProxyError {
    fn from(err: PolicyError) -> Self {
        ProxyError::InvalidRequest(err.to_string())
    }
}

impl From<ResolveError> for ProxyError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Upstream(e) => ProxyError::Upstream(e.to_string()),
            ResolveError::WaitTimedOut(_) => ProxyError::GatewayTimeout(err.to_string()),
            ResolveError::Internal(_) => ProxyError::Internal(err.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ProxyError::InvalidRequest(msg)
            | ProxyError::Forbidden(msg)
            | ProxyError::Upstream(msg)
            | ProxyError::GatewayTimeout(msg)
            | ProxyError::Internal(msg) => msg,
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the proxy server.
pub type Result<T> = std::result::Result<T, ProxyError>;
