//! SideEffectRunner - bounded worker pool for post-commit side effects.
//!
//! Audit writes and notification dispatches run here after a transition has
//! been committed. They never influence the outcome of the transition:
//!
//! - The queue is bounded. When it is full the job is dropped with a warning.
//! - Each job runs under a timeout. A job that overruns is abandoned.
//! - Failures are logged and discarded.
//!
//! Jobs live only in memory; a crash loses whatever is still queued.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `workers` | 4 | Concurrent jobs |
//! | `queue_capacity` | 1024 | Jobs waiting before new ones are shed |
//! | `task_timeout` | 30s | Upper bound on a single job |
//!
//! ## Graceful Shutdown
//!
//! [`SideEffectRunner::shutdown`] stops accepting jobs, lets the workers
//! drain the queue, and gives up after the supplied grace period.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Configuration for the side effect worker pool.
#[derive(Debug, Clone)]
pub struct SideEffectConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub task_timeout: Duration,
}

impl Default for SideEffectConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            task_timeout: Duration::from_secs(30),
        }
    }
}

struct Job {
    name: &'static str,
    work: BoxFuture<'static, Result<(), String>>,
}

/// Fixed pool of workers draining a bounded job queue.
pub struct SideEffectRunner {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl SideEffectRunner {
    /// Spawns the workers. Must be called from within a tokio runtime.
    pub fn start(config: SideEffectConfig) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let timeout = config.task_timeout;
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        match job {
                            Some(job) => run_job(worker, job, timeout).await,
                            None => break,
                        }
                    }
                    tracing::debug!(worker, "side effect worker stopped");
                })
            })
            .collect();

        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            workers: tokio::sync::Mutex::new(workers),
        })
    }

    /// Queues a job. Returns false if it was shed because the queue is full
    /// or the runner has shut down.
    pub fn submit<F, E>(&self, name: &'static str, work: F) -> bool
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + 'static,
    {
        let job = Job {
            name,
            work: work.map(|result| result.map_err(|e| e.to_string())).boxed(),
        };

        let guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(sender) = guard.as_ref() else {
            tracing::warn!(job = name, "side effect runner is shut down; dropping job");
            return false;
        };

        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(job = name, "side effect queue full; dropping job");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(job = name, "side effect queue closed; dropping job");
                false
            }
        }
    }

    /// Stops accepting jobs and waits up to `grace` for queued ones to finish.
    pub async fn shutdown(&self, grace: Duration) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);

        let handles: Vec<_> = self.workers.lock().await.drain(..).collect();
        if tokio::time::timeout(grace, join_all(handles)).await.is_err() {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "side effects still running at shutdown deadline"
            );
        }
    }
}

async fn run_job(worker: usize, job: Job, timeout: Duration) {
    match tokio::time::timeout(timeout, job.work).await {
        Ok(Ok(())) => tracing::debug!(worker, job = job.name, "side effect completed"),
        Ok(Err(error)) => {
            tracing::warn!(worker, job = job.name, %error, "side effect failed")
        }
        Err(_) => tracing::warn!(
            worker,
            job = job.name,
            timeout_ms = timeout.as_millis() as u64,
            "side effect timed out"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Notify};

    fn config(workers: usize, queue_capacity: usize, timeout_ms: u64) -> SideEffectConfig {
        SideEffectConfig {
            workers,
            queue_capacity,
            task_timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn submitted_jobs_run() {
        let runner = SideEffectRunner::start(config(2, 8, 1_000));
        let (tx, rx) = oneshot::channel();

        assert!(runner.submit("probe", async move {
            let _ = tx.send(42);
            Ok::<_, Infallible>(())
        }));

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn full_queue_sheds_jobs() {
        let runner = SideEffectRunner::start(config(1, 1, 5_000));
        let release = Arc::new(Notify::new());
        let (started_tx, started_rx) = oneshot::channel();

        let gate = Arc::clone(&release);
        assert!(runner.submit("blocker", async move {
            let _ = started_tx.send(());
            gate.notified().await;
            Ok::<_, Infallible>(())
        }));
        started_rx.await.unwrap();

        assert!(runner.submit("queued", async { Ok::<_, Infallible>(()) }));
        assert!(!runner.submit("shed", async { Ok::<_, Infallible>(()) }));

        release.notify_one();
    }

    #[tokio::test]
    async fn failing_and_slow_jobs_do_not_stop_workers() {
        let runner = SideEffectRunner::start(config(1, 8, 20));
        let counter = Arc::new(AtomicUsize::new(0));

        runner.submit("fails", async { Err::<(), _>("boom") });
        runner.submit("slow", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Infallible>(())
        });
        let seen = Arc::clone(&counter);
        runner.submit("after", async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        });

        runner.shutdown(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_drains_queue_then_rejects() {
        let runner = SideEffectRunner::start(config(1, 16, 1_000));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let seen = Arc::clone(&counter);
            runner.submit("count", async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(())
            });
        }
        runner.shutdown(Duration::from_secs(2)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(!runner.submit("late", async { Ok::<_, Infallible>(()) }));
    }
}
