//! Admission Scheduler
//!
//! Holds one queue per policy and the process-wide active policy.

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use super::policy::Policy;
use super::queue::{JobQueue, ScheduledJob};

// == Admission ==
/// Acknowledgement for an admitted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Admission {
    /// Policy whose queue received the job
    pub policy: Policy,
    /// Depth of that queue right after the push
    pub queue_depth: usize,
    pub priority_class: u8,
}

// == Queue Depths ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepths {
    pub fcfs: usize,
    pub sjf: usize,
    pub rr: usize,
}

// == Admission Scheduler ==
/// Routes submissions into the active policy's queue.
///
/// The active policy lives in a watch channel so the dispatcher can be
/// woken when it changes. Switching policy never moves queued jobs: they
/// stay in the queue they were admitted to until that policy is active again.
#[derive(Debug)]
pub struct AdmissionScheduler {
    /// Indexed by `Policy::index`
    queues: [JobQueue; 3],
    active: watch::Sender<Policy>,
}

impl Default for AdmissionScheduler {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

impl AdmissionScheduler {
    pub fn new(initial: Policy) -> Self {
        let (active, _) = watch::channel(initial);
        Self {
            queues: [JobQueue::new(), JobQueue::new(), JobQueue::new()],
            active,
        }
    }

    // == Submit ==
    /// Classifies `url` under the active policy and enqueues it.
    pub fn submit(&self, url: &str) -> Admission {
        let policy = self.active_policy();
        let priority_class = policy.priority_class(url);
        let queue_depth = self
            .queue(policy)
            .push(ScheduledJob::new(url, priority_class));

        info!(url, %policy, priority_class, queue_depth, "queued fetch job");
        Admission {
            policy,
            queue_depth,
            priority_class,
        }
    }

    // == Active Policy ==
    pub fn active_policy(&self) -> Policy {
        *self.active.borrow()
    }

    /// Makes `policy` the one the dispatcher reads from next.
    /// Returns the previously active policy.
    pub fn set_active_policy(&self, policy: Policy) -> Policy {
        let previous = self.active.send_replace(policy);
        if previous != policy {
            info!(from = %previous, to = %policy, "scheduler policy changed");
        }
        previous
    }

    /// Receiver that observes every policy change.
    pub fn watch_policy(&self) -> watch::Receiver<Policy> {
        self.active.subscribe()
    }

    pub fn queue(&self, policy: Policy) -> &JobQueue {
        &self.queues[policy.index()]
    }

    pub fn queue_depths(&self) -> QueueDepths {
        QueueDepths {
            fcfs: self.queue(Policy::Fcfs).len(),
            sjf: self.queue(Policy::Sjf).len(),
            rr: self.queue(Policy::Rr).len(),
        }
    }
}
