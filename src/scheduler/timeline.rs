//! Timeline Simulator
//!
//! Offline CPU-style scheduling for visualisation. Produces Gantt slices for
//! a set of processes; live dispatch never uses this, and round robin here
//! is the preemptive, quantum-based variant.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::policy::Policy;

/// Quantum used when the caller does not give one.
pub const DEFAULT_QUANTUM: u64 = 2;

/// Upper bound on slices in one timeline.
pub const MAX_SLICES: usize = 10_000;

// == Process ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    pub arrival: u64,
    pub burst: u64,
}

impl Process {
    pub fn new(id: impl Into<String>, arrival: u64, burst: u64) -> Self {
        Self {
            id: id.into(),
            arrival,
            burst,
        }
    }
}

// == Slice ==
/// One contiguous run of a process on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub id: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("round robin quantum must be positive")]
    ZeroQuantum,

    #[error("timeline overflows at process {0}")]
    Overflow(String),

    #[error("timeline exceeds {MAX_SLICES} slices")]
    TooManySlices,
}

/// End time of `p` when it runs for `run` units from `start`.
fn end_of(p: &Process, start: u64, run: u64) -> Result<u64, TimelineError> {
    start
        .checked_add(run)
        .ok_or_else(|| TimelineError::Overflow(p.id.clone()))
}

fn check_len(processes: &[Process]) -> Result<(), TimelineError> {
    if processes.len() > MAX_SLICES {
        return Err(TimelineError::TooManySlices);
    }
    Ok(())
}

// == Simulate ==
/// Runs `processes` under `policy`. `quantum` only matters for round robin.
pub fn simulate(
    policy: Policy,
    processes: &[Process],
    quantum: Option<u64>,
) -> Result<Vec<Slice>, TimelineError> {
    match policy {
        Policy::Fcfs => fcfs(processes),
        Policy::Sjf => sjf(processes),
        Policy::Rr => round_robin(processes, quantum.unwrap_or(DEFAULT_QUANTUM)),
    }
}

/// Processes sorted by arrival; input order breaks ties.
fn by_arrival(processes: &[Process]) -> Vec<&Process> {
    let mut sorted: Vec<&Process> = processes.iter().collect();
    sorted.sort_by_key(|p| p.arrival);
    sorted
}

// == FCFS ==
/// Runs each process to completion in arrival order.
pub fn fcfs(processes: &[Process]) -> Result<Vec<Slice>, TimelineError> {
    check_len(processes)?;
    let mut time: u64 = 0;
    by_arrival(processes)
        .into_iter()
        .map(|p| {
            let start = time.max(p.arrival);
            time = end_of(p, start, p.burst)?;
            Ok(Slice {
                id: p.id.clone(),
                start,
                end: time,
            })
        })
        .collect()
}

// == SJF ==
/// Non-preemptive shortest job first among the processes that have arrived.
///
/// Ties go to the earlier arrival, then to input order.
pub fn sjf(processes: &[Process]) -> Result<Vec<Slice>, TimelineError> {
    check_len(processes)?;
    let mut pending = by_arrival(processes);
    let mut timeline = Vec::with_capacity(pending.len());
    let mut time: u64 = 0;

    while !pending.is_empty() {
        let next = pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.arrival <= time)
            .min_by_key(|(i, p)| (p.burst, *i))
            .map(|(i, _)| i);

        let Some(index) = next else {
            // Idle until the earliest pending arrival.
            time = pending[0].arrival;
            continue;
        };
        let p = pending.remove(index);
        let end = end_of(p, time, p.burst)?;
        timeline.push(Slice {
            id: p.id.clone(),
            start: time,
            end,
        });
        time = end;
    }
    Ok(timeline)
}

// == Round Robin ==
/// Preemptive round robin with a fixed quantum.
///
/// A process that still has work after its slice goes to the back of the
/// ready queue, ahead of anything that arrived during that slice.
pub fn round_robin(processes: &[Process], quantum: u64) -> Result<Vec<Slice>, TimelineError> {
    if quantum == 0 {
        return Err(TimelineError::ZeroQuantum);
    }

    let arrivals = by_arrival(processes);
    let mut remaining: Vec<u64> = arrivals.iter().map(|p| p.burst).collect();
    let mut ready: VecDeque<usize> = VecDeque::new();
    let mut timeline = Vec::new();
    let mut next_arrival = 0;
    let mut time: u64 = 0;

    while next_arrival < arrivals.len() || !ready.is_empty() {
        while next_arrival < arrivals.len() && arrivals[next_arrival].arrival <= time {
            ready.push_back(next_arrival);
            next_arrival += 1;
        }
        let Some(index) = ready.pop_front() else {
            time = arrivals[next_arrival].arrival;
            continue;
        };

        if timeline.len() == MAX_SLICES {
            return Err(TimelineError::TooManySlices);
        }
        let run = quantum.min(remaining[index]);
        let end = end_of(arrivals[index], time, run)?;
        timeline.push(Slice {
            id: arrivals[index].id.clone(),
            start: time,
            end,
        });
        time = end;
        remaining[index] -= run;
        if remaining[index] > 0 {
            ready.push_back(index);
        }
    }
    Ok(timeline)
}
