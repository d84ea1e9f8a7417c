//! Job Queue
//!
//! One queue per policy. Jobs are ordered by priority class, then by
//! arrival; the blocking dequeue parks on a `Notify` until a push.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;

// == Scheduled Job ==
/// A URL waiting to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledJob {
    pub key: String,
    pub enqueued_at: DateTime<Utc>,
    /// Lower is served first
    pub priority_class: u8,
    /// Arrival order, assigned on first push
    #[serde(skip)]
    sequence: Option<u64>,
}

impl ScheduledJob {
    pub fn new(key: impl Into<String>, priority_class: u8) -> Self {
        Self {
            key: key.into(),
            enqueued_at: Utc::now(),
            priority_class,
            sequence: None,
        }
    }
}

/// Heap slot: min-ordered by class, then by arrival sequence.
#[derive(Debug)]
struct Slot {
    sequence: u64,
    job: ScheduledJob,
}

impl Slot {
    fn new(sequence: u64, mut job: ScheduledJob) -> Self {
        job.sequence = Some(sequence);
        Self { sequence, job }
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest, so reverse both keys.
        other
            .job
            .priority_class
            .cmp(&self.job.priority_class)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<Slot>,
    next_sequence: u64,
}

// == Job Queue ==
/// Thread-safe queue with a blocking dequeue.
#[derive(Debug, Default)]
pub struct JobQueue {
    inner: Mutex<Inner>,
    /// Wakes a parked dequeue when a job is pushed
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job and returns the queue depth after the push.
    pub fn push(&self, job: ScheduledJob) -> usize {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.heap.push(Slot::new(sequence, job));
        let depth = inner.heap.len();
        drop(inner);

        self.notify.notify_one();
        depth
    }

    /// Puts a popped job back at its original arrival position.
    ///
    /// A job that never went through `push` is treated as a new arrival.
    pub fn requeue(&self, job: ScheduledJob) -> usize {
        let Some(sequence) = job.sequence else {
            return self.push(job);
        };
        let mut inner = self.inner.lock();
        inner.heap.push(Slot::new(sequence, job));
        let depth = inner.heap.len();
        drop(inner);

        self.notify.notify_one();
        depth
    }

    /// Removes the next job without waiting.
    pub fn try_pop(&self) -> Option<ScheduledJob> {
        self.inner.lock().heap.pop().map(|slot| slot.job)
    }

    /// Waits until a job is available and removes it.
    ///
    /// Cancel safe: dropping the future never loses a job, because the pop
    /// happens without an intervening await.
    pub async fn pop(&self) -> ScheduledJob {
        loop {
            if let Some(job) = self.try_pop() {
                return job;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn drain(queue: &JobQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.try_pop()).map(|job| job.key).collect()
    }

    #[test]
    fn test_single_class_is_fifo() {
        let queue = JobQueue::new();
        queue.push(ScheduledJob::new("a", 0));
        queue.push(ScheduledJob::new("b", 0));
        queue.push(ScheduledJob::new("c", 0));

        assert_eq!(drain(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lower_class_first_ties_by_arrival() {
        let queue = JobQueue::new();
        queue.push(ScheduledJob::new("movie.mp4", 3));
        queue.push(ScheduledJob::new("logo.png", 2));
        queue.push(ScheduledJob::new("a.css", 1));
        queue.push(ScheduledJob::new("other.bin", 2));
        queue.push(ScheduledJob::new("b.js", 1));

        assert_eq!(
            drain(&queue),
            vec!["a.css", "b.js", "logo.png", "other.bin", "movie.mp4"]
        );
    }

    #[test]
    fn test_push_reports_depth() {
        let queue = JobQueue::new();
        assert_eq!(queue.push(ScheduledJob::new("a", 0)), 1);
        assert_eq!(queue.push(ScheduledJob::new("b", 0)), 2);
        queue.try_pop();
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_requeue_keeps_arrival_position() {
        let queue = JobQueue::new();
        queue.push(ScheduledJob::new("first", 0));
        queue.push(ScheduledJob::new("second", 0));

        let first = queue.try_pop().unwrap();
        queue.push(ScheduledJob::new("third", 0));
        assert_eq!(queue.requeue(first), 3);

        assert_eq!(drain(&queue), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_requeue_unpushed_job_goes_last() {
        let queue = JobQueue::new();
        queue.push(ScheduledJob::new("a", 0));
        queue.requeue(ScheduledJob::new("b", 0));

        assert_eq!(drain(&queue), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(JobQueue::new());

        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        queue.push(ScheduledJob::new("late", 0));
        let job = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.key, "late");
    }

    #[test]
    fn test_push_wakes_parked_pop() {
        let queue = JobQueue::new();
        let mut pop = tokio_test::task::spawn(queue.pop());

        tokio_test::assert_pending!(pop.poll());
        queue.push(ScheduledJob::new("wake", 0));

        assert!(pop.is_woken());
        let job = tokio_test::assert_ready!(pop.poll());
        assert_eq!(job.key, "wake");
    }

    #[tokio::test]
    async fn test_cancelled_pop_loses_nothing() {
        let queue = JobQueue::new();

        let timed_out = tokio::time::timeout(Duration::from_millis(10), queue.pop()).await;
        assert!(timed_out.is_err());

        queue.push(ScheduledJob::new("kept", 0));
        assert_eq!(queue.pop().await.key, "kept");
    }
}
