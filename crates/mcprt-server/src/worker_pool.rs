//! Dispatcher worker pool (spec §4.7 "Worker pool"): a bounded
//! `tokio::sync::mpsc` channel feeding a fixed set of spawned worker tasks,
//! the async-native stand-in for the spec's OS thread pool consuming a
//! bounded work queue (§5 "Scheduling model").

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Worker pool submission failures (spec §4.7: "Queue-full is reported as
/// `internal_error` with a retriable hint; no silent drops").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPoolError {
    #[error("worker pool queue is full, retry")]
    QueueFull,
    #[error("worker pool is shut down")]
    Closed,
}

#[derive(Debug, Default)]
struct StatsInner {
    submitted: std::sync::atomic::AtomicU64,
    completed: std::sync::atomic::AtomicU64,
    failed: std::sync::atomic::AtomicU64,
    active: std::sync::atomic::AtomicU64,
}

/// Point-in-time worker pool counters (spec §4.7: "observable stats
/// (submitted, completed, failed, active)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerPoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub active: u64,
}

/// A bounded-queue pool of worker tasks. `resize` grows immediately by
/// spawning more workers; shrinking is lazy — each worker checks the
/// current target size after finishing a task and exits once the running
/// count exceeds it, rather than being killed mid-task.
pub struct WorkerPool {
    sender: mpsc::Sender<BoxedTask>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<BoxedTask>>>,
    stats: Arc<StatsInner>,
    target_size: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    cancellation: CancellationToken,
}

impl WorkerPool {
    #[must_use]
    pub fn new(size: usize, queue_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let stats = Arc::new(StatsInner::default());
        let target_size = Arc::new(AtomicUsize::new(size));
        let running = Arc::new(AtomicUsize::new(0));
        let cancellation = CancellationToken::new();

        for _ in 0..size {
            spawn_worker(
                receiver.clone(),
                stats.clone(),
                target_size.clone(),
                running.clone(),
                cancellation.clone(),
            );
        }

        Self {
            sender,
            receiver,
            stats,
            target_size,
            running,
            cancellation,
        }
    }

    /// The `2 × cores + 1` auto-adjust heuristic (spec §4.7).
    #[must_use]
    pub fn auto_adjust_target() -> usize {
        std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1) * 2 + 1
    }

    /// Submits a boxed future for execution. Returns immediately with
    /// [`WorkerPoolError::QueueFull`] rather than blocking the caller when
    /// the bounded queue is saturated.
    pub fn submit(&self, task: BoxedTask) -> Result<(), WorkerPoolError> {
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        match self.sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                Err(WorkerPoolError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                Err(WorkerPoolError::Closed)
            }
        }
    }

    /// Resizes the pool to `new_size` workers. Growth spawns additional
    /// workers against the same shared queue immediately; shrinkage is
    /// honored lazily as existing workers finish their current task and
    /// notice the lowered target.
    pub fn resize(&self, new_size: usize) {
        let old = self.target_size.swap(new_size, Ordering::SeqCst);
        if new_size > old {
            for _ in 0..(new_size - old) {
                spawn_worker(
                    self.receiver.clone(),
                    self.stats.clone(),
                    self.target_size.clone(),
                    self.running.clone(),
                    self.cancellation.clone(),
                );
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            active: self.stats.active.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn target_size(&self) -> usize {
        self.target_size.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Relaxed)
    }

    /// Stops accepting new growth and lets in-flight workers drain, then
    /// signals all workers to exit after their current task.
    pub fn shutdown(&self) {
        self.target_size.store(0, Ordering::SeqCst);
        self.cancellation.cancel();
    }
}

fn spawn_worker(
    receiver: Arc<AsyncMutex<mpsc::Receiver<BoxedTask>>>,
    stats: Arc<StatsInner>,
    target_size: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    cancellation: CancellationToken,
) {
    running.fetch_add(1, Ordering::SeqCst);
    tokio::spawn(async move {
        loop {
            if running.load(Ordering::SeqCst) > target_size.load(Ordering::SeqCst) {
                break;
            }
            let task = tokio::select! {
                biased;
                () = cancellation.cancelled() => None,
                task = async {
                    let mut rx = receiver.lock().await;
                    rx.recv().await
                } => task,
            };
            let Some(task) = task else { break };

            stats.active.fetch_add(1, Ordering::Relaxed);
            task.await;
            stats.active.fetch_sub(1, Ordering::Relaxed);
            stats.completed.fetch_add(1, Ordering::Relaxed);
        }
        running.fetch_sub(1, Ordering::SeqCst);
    });
}
