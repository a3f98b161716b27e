//! Fixed-size background worker pool.
//!
//! Each worker owns a bounded queue. Jobs carry a routing key, so every job
//! submitted with the same key lands on the same worker and runs in
//! submission order. There is no cancellation: a queued job always runs.

use std::{
    collections::hash_map::DefaultHasher,
    future::Future,
    hash::{Hash, Hasher},
    panic::AssertUnwindSafe,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::{future::BoxFuture, FutureExt};
use tokio::{
    sync::{mpsc, oneshot, Mutex, RwLock},
    task::JoinHandle,
};

type Job = BoxFuture<'static, ()>;

/// Worker pool errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool no longer accepts work.
    #[error("Worker pool is shut down")]
    ShutDown,

    /// The job panicked before producing a result.
    #[error("Background job failed before completing")]
    JobFailed,
}

/// Handle to a submitted job's result.
///
/// Await it for the result, or drop it to let the job finish unobserved.
#[must_use = "dropping a JobHandle discards the job's result"]
pub struct JobHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| PoolError::JobFailed))
    }
}

/// Bounded, keyed worker pool.
pub struct WorkerPool {
    /// Per-worker queues; `None` once shut down.
    senders: RwLock<Option<Vec<mpsc::Sender<Job>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Spawns `worker_count` workers, each with room for `queue_capacity`
    /// pending jobs. Must be called inside a Tokio runtime.
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let (tx, rx) = mpsc::channel(queue_capacity.max(1));
            senders.push(tx);
            workers.push(tokio::spawn(run_worker(index, rx)));
        }

        tracing::debug!(worker_count, queue_capacity, "Worker pool started");

        Self {
            senders: RwLock::new(Some(senders)),
            workers: Mutex::new(workers),
            worker_count,
        }
    }

    /// Number of workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub async fn is_shut_down(&self) -> bool {
        self.senders.read().await.is_none()
    }

    fn route(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.worker_count as u64) as usize
    }

    /// Queues a job on the worker owning `key`.
    ///
    /// Waits only while that worker's queue is full.
    pub async fn submit<F, T>(&self, key: &str, job: F) -> Result<JobHandle<T>, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = {
            let senders = self.senders.read().await;
            let senders = senders.as_ref().ok_or(PoolError::ShutDown)?;
            senders[self.route(key)].clone()
        };

        let (tx, rx) = oneshot::channel();
        let wrapped: Job = Box::pin(async move {
            // The submitter may have dropped its handle
            let _ = tx.send(job.await);
        });

        sender
            .send(wrapped)
            .await
            .map_err(|_| PoolError::ShutDown)?;

        Ok(JobHandle { rx })
    }

    /// Stops accepting jobs, lets queued jobs drain, then waits for every
    /// worker to exit.
    pub async fn shutdown(&self) {
        if self.senders.write().await.take().is_none() {
            return;
        }

        let workers = std::mem::take(&mut *self.workers.lock().await);
        tracing::info!(workers = workers.len(), "Draining worker pool");

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "Worker exited abnormally");
            }
        }

        tracing::info!("Worker pool shut down");
    }
}

async fn run_worker(index: usize, mut rx: mpsc::Receiver<Job>) {
    while let Some(job) = rx.recv().await {
        // A panicking job must not take the worker down with it
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::warn!(worker = index, "Background job panicked");
        }
    }
    tracing::debug!(worker = index, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use super::*;

    #[tokio::test]
    async fn test_job_result_is_returned() {
        let pool = WorkerPool::new(2, 4);
        let handle = pool.submit("uid-1", async { 40 + 2 }).await.unwrap();
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_same_key_runs_in_submission_order() {
        let pool = WorkerPool::new(4, 16);
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..20u64 {
            let order = order.clone();
            handles.push(
                pool.submit("same-user", async move {
                    // Earlier jobs sleep longer; ordering must still hold
                    tokio::time::sleep(Duration::from_millis(20 - i)).await;
                    order.lock().await.push(i);
                })
                .await
                .unwrap(),
            );
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().await, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_dropped_handle_still_runs_job() {
        let pool = WorkerPool::new(1, 4);
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        drop(
            pool.submit("k", async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap(),
        );

        pool.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_then_rejects() {
        let pool = WorkerPool::new(2, 8);
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 0..6 {
            let c = counter.clone();
            let _ = pool
                .submit(&format!("user-{i}"), async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 6);
        assert!(pool.is_shut_down().await);

        let err = pool.submit("late", async {}).await.err();
        assert_eq!(err, Some(PoolError::ShutDown));

        // Second shutdown is a no-op
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(1, 4);

        let failed = pool
            .submit("k", async {
                panic!("boom");
            })
            .await
            .unwrap();
        assert_eq!(failed.await, Err::<(), _>(PoolError::JobFailed));

        let ok = pool.submit("k", async { "still alive" }).await.unwrap();
        assert_eq!(ok.await.unwrap(), "still alive");
    }

    #[test]
    fn test_routing_is_stable() {
        tokio_test::block_on(async {
            let pool = WorkerPool::new(3, 1);
            assert_eq!(pool.route("abc"), pool.route("abc"));
            assert!(pool.route("xyz") < 3);
            assert_eq!(pool.worker_count(), 3);
        });
    }
}
