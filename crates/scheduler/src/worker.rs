//! Loader worker pool
//!
//! A pool of threads that pull load jobs from the scheduler and hand them to
//! an executor callback. The executor does the actual decode work (outside
//! this crate's scope) and checks the job's cancellation token between steps.

use crate::{CancellationToken, LoadJob, LoadScheduler};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Callback invoked by workers for each job.
///
/// Receives the job and its cancellation token. Implementations should check
/// `token.is_cancelled()` periodically and return early when set.
pub type JobExecutor = Arc<dyn Fn(&LoadJob, &CancellationToken) + Send + Sync>;

/// Configuration for the loader pool.
#[derive(Debug, Clone)]
pub struct LoaderPoolConfig {
    /// Number of worker threads. Default: number of logical CPU cores.
    pub num_workers: usize,

    /// How long an idle worker sleeps before re-checking the queue.
    /// Default: 10ms.
    pub poll_interval: Duration,
}

impl Default for LoaderPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus(),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl LoaderPoolConfig {
    /// Create a configuration with an explicit worker count.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    /// Set the idle poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Worker pool draining the load scheduler.
///
/// Each worker pulls the next job (view lane first), skips jobs whose token
/// was already cancelled, runs the executor, and reports completion.
///
/// # Example
///
/// ```
/// use book_viewer_scheduler::{LoadScheduler, LoaderPool, LoaderPoolConfig};
/// use std::sync::Arc;
///
/// let scheduler = Arc::new(LoadScheduler::new());
/// let executor = Arc::new(|job: &book_viewer_scheduler::LoadJob,
///                          token: &book_viewer_scheduler::CancellationToken| {
///     if token.is_cancelled() {
///         return;
///     }
///     // decode page job.page_index ...
/// });
/// let pool = LoaderPool::new(Arc::clone(&scheduler), executor, LoaderPoolConfig::new(2));
///
/// scheduler.submit_view(&[0, 1]);
/// // workers drain the batch in the background ...
/// pool.shutdown();
/// ```
pub struct LoaderPool {
    workers: Vec<Worker>,
    shutdown: Arc<AtomicBool>,
}

impl LoaderPool {
    /// Spawn the pool.
    pub fn new(scheduler: Arc<LoadScheduler>, executor: JobExecutor, config: LoaderPoolConfig) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let workers = (0..config.num_workers)
            .map(|id| {
                Worker::new(
                    id,
                    Arc::clone(&scheduler),
                    Arc::clone(&executor),
                    Arc::clone(&shutdown),
                    config.poll_interval,
                )
            })
            .collect();

        Self { workers, shutdown }
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop the pool and wait for every worker to finish its current job.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Release);
        for worker in self.workers {
            worker.join();
        }
    }
}

struct Worker {
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(
        id: usize,
        scheduler: Arc<LoadScheduler>,
        executor: JobExecutor,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        let thread = thread::Builder::new()
            .name(format!("page-load-worker-{}", id))
            .spawn(move || Self::run(scheduler, executor, shutdown, poll_interval))
            .expect("failed to spawn loader worker");

        Self {
            thread: Some(thread),
        }
    }

    fn run(
        scheduler: Arc<LoadScheduler>,
        executor: JobExecutor,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            match scheduler.next_job() {
                Some(job) => {
                    let token = scheduler.cancellation_token(job.id).unwrap_or_default();
                    if !token.is_cancelled() {
                        executor(&job, &token);
                    }
                    scheduler.complete_job(job.id);
                }
                None => thread::sleep(poll_interval),
            }
        }
    }

    fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join().expect("loader worker panicked");
        }
    }
}

fn num_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
