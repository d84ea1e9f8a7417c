//! Scheduler Module
//!
//! Admission of fetch jobs under a live-switchable policy (FCFS, SJF, RR),
//! plus an offline timeline simulator for the same policy names.
//!
//! Fetch jobs are single, non-preemptible operations, so live round robin
//! dispatches in arrival order. The quantum-based round robin exists only
//! in [`timeline`].

mod admission;
mod policy;
mod queue;
pub mod timeline;

pub use admission::{Admission, AdmissionScheduler, QueueDepths};
pub use policy::{size_class, Policy, PolicyError, DEFAULT_SIZE_CLASS};
pub use queue::{JobQueue, ScheduledJob};
