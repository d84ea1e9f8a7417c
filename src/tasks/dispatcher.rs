//! Dispatcher Task
//!
//! The single loop that moves jobs from the active policy's queue into the
//! worker pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::worker_pool::PoolHandle;
use crate::scheduler::AdmissionScheduler;

/// Spawns the dispatch loop.
///
/// Each iteration reads the active policy and waits on that policy's queue.
/// A policy switch wakes the wait so the next iteration reads the new
/// queue; jobs left in other queues stay where they are. A failed hand-off
/// puts the job back and pauses for `backoff` instead of ending the loop.
///
/// # Arguments
/// * `scheduler` - Shared admission scheduler
/// * `pool` - Submission side of the worker pool
/// * `backoff` - Pause after a failed iteration
///
/// # Returns
/// A JoinHandle that can be aborted during graceful shutdown.
pub fn spawn_dispatcher(
    scheduler: Arc<AdmissionScheduler>,
    pool: PoolHandle,
    backoff: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("dispatcher started");
        let mut policy_rx = scheduler.watch_policy();

        loop {
            let policy = *policy_rx.borrow_and_update();
            let queue = scheduler.queue(policy);

            let job = tokio::select! {
                job = queue.pop() => job,
                changed = policy_rx.changed() => {
                    if changed.is_err() {
                        warn!("policy channel closed, dispatcher stopping");
                        break;
                    }
                    debug!(from = %policy, "dispatcher switching queue");
                    continue;
                }
            };

            debug!(url = %job.key, %policy, "dispatching job");
            if let Err(e) = pool.submit(job.key.clone()).await {
                error!(url = %job.key, error = %e, "dispatch failed, retrying after backoff");
                queue.requeue(job);
                tokio::time::sleep(backoff).await;
            }
        }
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache;
    use crate::coordinator::FetchCoordinator;
    use crate::fetcher::testing::StubFetcher;
    use crate::scheduler::Policy;
    use crate::tasks::WorkerPool;

    struct Harness {
        scheduler: Arc<AdmissionScheduler>,
        coordinator: FetchCoordinator,
        fetcher: Arc<StubFetcher>,
        pool: WorkerPool,
    }

    fn harness(initial: Policy) -> Harness {
        let coordinator = FetchCoordinator::new(cache::shared(1024 * 1024), None);
        let fetcher = Arc::new(StubFetcher::default());
        let pool = WorkerPool::spawn(
            2,
            8,
            coordinator.clone(),
            fetcher.clone(),
            Duration::from_secs(1),
        );
        Harness {
            scheduler: Arc::new(AdmissionScheduler::new(initial)),
            coordinator,
            fetcher,
            pool,
        }
    }

    async fn wait_for_items(coordinator: &FetchCoordinator, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while coordinator.cache_stats().item_count < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs were not processed in time");
    }

    #[tokio::test]
    async fn test_dispatches_queued_jobs() {
        let h = harness(Policy::Fcfs);
        h.scheduler.submit("http://a/1");
        h.scheduler.submit("http://a/2");

        let dispatcher =
            spawn_dispatcher(h.scheduler.clone(), h.pool.handle(), Duration::from_millis(10));
        wait_for_items(&h.coordinator, 2).await;

        assert_eq!(h.fetcher.calls(), 2);
        assert_eq!(h.scheduler.queue_depths().fcfs, 0);
        dispatcher.abort();
    }

    #[tokio::test]
    async fn test_policy_switch_wakes_dispatcher() {
        let h = harness(Policy::Fcfs);
        let dispatcher =
            spawn_dispatcher(h.scheduler.clone(), h.pool.handle(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Dispatcher is parked on the empty FCFS queue.
        h.scheduler.set_active_policy(Policy::Sjf);
        h.scheduler.submit("http://a/site.css");
        wait_for_items(&h.coordinator, 1).await;

        assert_eq!(h.scheduler.queue_depths().sjf, 0);
        dispatcher.abort();
    }

    #[tokio::test]
    async fn test_jobs_under_inactive_policy_stay_stranded() {
        let h = harness(Policy::Rr);
        h.scheduler.submit("http://a/rr-1");
        h.scheduler.submit("http://a/rr-2");
        h.scheduler.set_active_policy(Policy::Fcfs);
        h.scheduler.submit("http://a/fcfs");

        let dispatcher =
            spawn_dispatcher(h.scheduler.clone(), h.pool.handle(), Duration::from_millis(10));
        wait_for_items(&h.coordinator, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(h.fetcher.calls(), 1);
        assert_eq!(h.scheduler.queue_depths().rr, 2);
        dispatcher.abort();
    }

    #[tokio::test]
    async fn test_failed_handoff_keeps_job_queued() {
        let h = harness(Policy::Fcfs);
        let handle = h.pool.handle();
        h.pool.abort_workers();
        h.pool.shutdown().await;

        h.scheduler.submit("http://a/1");
        let dispatcher = spawn_dispatcher(h.scheduler.clone(), handle, Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!dispatcher.is_finished());
        assert_eq!(h.scheduler.queue_depths().fcfs, 1);
        dispatcher.abort();
    }

    #[tokio::test]
    async fn test_failed_handoff_keeps_arrival_order() {
        let h = harness(Policy::Fcfs);
        let handle = h.pool.handle();
        h.pool.abort_workers();
        h.pool.shutdown().await;

        h.scheduler.submit("http://a/1");
        let dispatcher = spawn_dispatcher(h.scheduler.clone(), handle, Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.scheduler.submit("http://a/2");
        dispatcher.abort();
        let _ = dispatcher.await;

        let queue = h.scheduler.queue(Policy::Fcfs);
        let order: Vec<String> = std::iter::from_fn(|| queue.try_pop()).map(|job| job.key).collect();
        assert_eq!(order, vec!["http://a/1", "http://a/2"]);
    }
}
