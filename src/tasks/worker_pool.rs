//! Worker Pool
//!
//! A fixed number of worker tasks fed through one bounded channel. Each job
//! is a URL resolved through the coordinator, so pool size is the ceiling on
//! concurrent origin fetches started by dispatch.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::FetchCoordinator;
use crate::fetcher::Fetcher;

// == Pool Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
}

/// Everything a worker needs to run a job.
#[derive(Clone)]
struct WorkerContext {
    coordinator: FetchCoordinator,
    fetcher: Arc<dyn Fetcher>,
    fetch_timeout: Duration,
}

// == Pool Handle ==
/// Cloneable submission side of the pool.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    sender: mpsc::Sender<String>,
}

impl PoolHandle {
    /// Hands `key` to the next free worker, waiting while the channel is full.
    pub async fn submit(&self, key: String) -> Result<(), PoolError> {
        self.sender.send(key).await.map_err(|_| PoolError::Closed)
    }
}

// == Worker Pool ==
pub struct WorkerPool {
    handle: PoolHandle,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers sharing a channel of `queue_capacity` slots.
    ///
    /// # Arguments
    /// * `size` - Number of worker tasks, at least one
    /// * `queue_capacity` - Jobs buffered before `submit` waits
    /// * `coordinator` - Coordinator every job resolves through
    /// * `fetcher` - Origin fetcher used by the producer of each epoch
    /// * `fetch_timeout` - Per-request origin timeout
    pub fn spawn(
        size: usize,
        queue_capacity: usize,
        coordinator: FetchCoordinator,
        fetcher: Arc<dyn Fetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let context = WorkerContext {
            coordinator,
            fetcher,
            fetch_timeout,
        };

        let workers = (0..size)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let context = context.clone();
                tokio::spawn(run_worker(id, receiver, context))
            })
            .collect();

        info!(size, queue_capacity, "worker pool started");
        Self {
            handle: PoolHandle { sender },
            workers,
        }
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    pub async fn submit(&self, key: String) -> Result<(), PoolError> {
        self.handle.submit(key).await
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Kills the workers without draining, closing the channel.
    #[cfg(test)]
    pub(crate) fn abort_workers(&self) {
        for worker in &self.workers {
            worker.abort();
        }
    }

    // == Shutdown ==
    /// Closes the pool and waits for the workers to drain the channel.
    ///
    /// Workers exit once every [`PoolHandle`] is dropped and queued jobs
    /// have run.
    pub async fn shutdown(self) {
        let Self { handle, workers } = self;
        drop(handle);
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        info!("worker pool stopped");
    }
}

async fn run_worker(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    context: WorkerContext,
) {
    debug!(worker = id, "worker started");
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(key) = next else {
            break;
        };
        process(id, &context, &key).await;
    }
    debug!(worker = id, "worker exiting");
}

async fn process(id: usize, context: &WorkerContext, key: &str) {
    let resolution = context
        .coordinator
        .resolve_with(key, Arc::clone(&context.fetcher), context.fetch_timeout)
        .await;

    match &resolution.outcome {
        Ok(fetched) => info!(
            worker = id,
            url = key,
            role = ?resolution.role,
            status = fetched.entry.status,
            cached = fetched.cached,
            "fetch job completed"
        ),
        Err(e) => warn!(worker = id, url = key, role = ?resolution.role, error = %e, "fetch job failed"),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache;
    use crate::fetcher::testing::StubFetcher;

    fn pool(size: usize, fetcher: Arc<StubFetcher>) -> (WorkerPool, FetchCoordinator) {
        let coordinator = FetchCoordinator::new(cache::shared(1024 * 1024), None);
        let pool = WorkerPool::spawn(
            size,
            16,
            coordinator.clone(),
            fetcher,
            Duration::from_secs(1),
        );
        (pool, coordinator)
    }

    #[tokio::test]
    async fn test_jobs_fill_the_cache() {
        let fetcher = Arc::new(StubFetcher::default());
        let (pool, coordinator) = pool(2, fetcher.clone());

        for i in 0..4 {
            pool.submit(format!("http://a/{}", i)).await.unwrap();
        }
        pool.shutdown().await;

        assert_eq!(fetcher.calls(), 4);
        assert_eq!(coordinator.cache_stats().item_count, 4);
    }

    #[tokio::test]
    async fn test_duplicate_jobs_coalesce() {
        let fetcher = Arc::new(StubFetcher::slow(Duration::from_millis(50)));
        let (pool, coordinator) = pool(4, fetcher.clone());

        for _ in 0..4 {
            pool.submit("http://a/same".to_string()).await.unwrap();
        }
        pool.shutdown().await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(coordinator.cache_stats().item_count, 1);
    }

    #[tokio::test]
    async fn test_failed_job_does_not_stop_worker() {
        let fetcher = Arc::new(StubFetcher::failing());
        let (pool, coordinator) = pool(1, fetcher.clone());

        pool.submit("http://a/1".to_string()).await.unwrap();
        pool.submit("http://a/2".to_string()).await.unwrap();
        pool.shutdown().await;

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(coordinator.cache_stats().item_count, 0);
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let fetcher = Arc::new(StubFetcher::default());
        let (pool, _) = pool(1, fetcher);
        assert_eq!(pool.size(), 1);

        let handle = pool.handle();
        pool.abort_workers();
        pool.shutdown().await;

        assert_eq!(
            handle.submit("http://a/late".to_string()).await,
            Err(PoolError::Closed)
        );
    }
}
