//! Background Tasks Module
//!
//! Long-running tasks spawned at startup.
//!
//! # Tasks
//! - Dispatcher: moves jobs from the active scheduler queue to the workers
//! - Worker pool: fixed set of workers resolving jobs through the coordinator

mod dispatcher;
mod worker_pool;

pub use dispatcher::spawn_dispatcher;
pub use worker_pool::{PoolError, PoolHandle, WorkerPool};
