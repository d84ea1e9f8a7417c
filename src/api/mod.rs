//! API Module
//!
//! HTTP handlers and routing for the proxy server REST API.
//!
//! # Endpoints
//! - `POST /fetch` - Queue a fetch under the active scheduling policy
//! - `GET /fetch?url=` - Fetch synchronously through the cache
//! - `GET /cache`, `GET /stats` - Cache and coordinator statistics
//! - `GET|PUT /scheduler`, `POST /scheduler/simulate` - Scheduling
//! - `GET|POST|DELETE /admin/blocklist` - Blocked domains
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
