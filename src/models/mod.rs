//! Request and Response models for the proxy API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{BlocklistRequest, FetchQuery, FetchRequest, PolicyRequest, SimulateRequest};
pub use responses::{
    BlocklistResponse, CacheListing, FetchAccepted, HealthResponse, PolicyChanged,
    SchedulerResponse, SimulateResponse, StatsResponse,
};
