//! Load scheduler with batch-replacing lanes
//!
//! The orchestrator hands the scheduler an ordered batch of pages per lane on
//! every navigation. A new batch supersedes the previous one in that lane:
//! stale queued jobs are removed and their tokens cancelled, so workers never
//! spend time decoding pages the user has already navigated away from.

use crate::cancel::{CancellationRegistry, CancellationToken};
use crate::priority::{JobId, JobLane, JobQueue, LoadJob};
use std::sync::Mutex;

/// Scheduler statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSchedulerStats {
    /// Total jobs submitted
    pub jobs_submitted: u64,

    /// Total jobs completed
    pub jobs_completed: u64,

    /// Total jobs cancelled
    pub jobs_cancelled: u64,

    /// Current queue size
    pub queue_size: usize,
}

impl LoadSchedulerStats {
    /// Jobs submitted but neither completed nor cancelled yet.
    pub fn pending_jobs(&self) -> u64 {
        self.jobs_submitted - self.jobs_completed - self.jobs_cancelled
    }
}

/// Two-lane page load scheduler
///
/// Thread-safe. Workers pull jobs with [`next_job`](Self::next_job) and report
/// back with [`complete_job`](Self::complete_job); each job carries a
/// cancellation token that workers check cooperatively.
///
/// # Example
///
/// ```
/// use book_viewer_scheduler::{JobLane, LoadScheduler};
///
/// let scheduler = LoadScheduler::new();
///
/// // Pages 4 and 5 are on screen, 6 and 7 are lookahead.
/// scheduler.submit_view(&[4, 5]);
/// scheduler.submit_ahead(&[6, 7]);
///
/// // Workers drain the view lane first.
/// let job = scheduler.next_job().unwrap();
/// assert_eq!(job.lane, JobLane::View);
/// assert_eq!(job.page_index, 4);
/// scheduler.complete_job(job.id);
/// ```
pub struct LoadScheduler {
    queue: JobQueue,
    cancellation: CancellationRegistry,
    state: Mutex<SchedulerState>,
}

struct SchedulerState {
    stats: LoadSchedulerStats,
}

impl LoadScheduler {
    /// Create a scheduler with empty lanes.
    pub fn new() -> Self {
        Self {
            queue: JobQueue::new(),
            cancellation: CancellationRegistry::new(),
            state: Mutex::new(SchedulerState {
                stats: LoadSchedulerStats::default(),
            }),
        }
    }

    /// Submit the ordered batch of visible pages.
    ///
    /// Replaces the previous view-lane batch: its queued jobs are cancelled
    /// before the new ones are enqueued. Returns the new job ids in batch
    /// order.
    pub fn submit_view(&self, pages: &[u32]) -> Vec<JobId> {
        self.submit_batch(JobLane::View, pages)
    }

    /// Submit the ordered lookahead batch.
    ///
    /// Replaces the previous ahead-lane batch, front of the slice first.
    pub fn submit_ahead(&self, pages: &[u32]) -> Vec<JobId> {
        self.submit_batch(JobLane::Ahead, pages)
    }

    fn submit_batch(&self, lane: JobLane, pages: &[u32]) -> Vec<JobId> {
        self.cancel_lane(lane);

        let ids: Vec<JobId> = pages
            .iter()
            .map(|&page_index| {
                let id = self.queue.push(lane, page_index);
                self.cancellation.register(id);
                id
            })
            .collect();

        let mut state = self.state.lock().unwrap();
        state.stats.jobs_submitted += ids.len() as u64;
        ids
    }

    /// Cancel every queued job in a lane. Returns how many were removed.
    pub fn cancel_lane(&self, lane: JobLane) -> usize {
        let stale: Vec<JobId> = self
            .queue
            .jobs()
            .into_iter()
            .filter(|job| job.lane == lane)
            .map(|job| job.id)
            .collect();

        self.cancellation.cancel_many(&stale);
        let removed = self.queue.remove_if(|job| job.lane == lane);

        if removed > 0 {
            log::trace!("superseded {} queued {:?}-lane jobs", removed, lane);
            let mut state = self.state.lock().unwrap();
            state.stats.jobs_cancelled += removed as u64;
            drop(state);

            for id in stale {
                self.cancellation.unregister(id);
            }
        }
        removed
    }

    /// Get the next job to execute, highest lane first.
    ///
    /// The job leaves the queue; its cancellation token stays registered
    /// until [`complete_job`](Self::complete_job) is called.
    pub fn next_job(&self) -> Option<LoadJob> {
        self.queue.pop()
    }

    /// Mark a job as completed and release its token registration.
    pub fn complete_job(&self, job_id: JobId) {
        let mut state = self.state.lock().unwrap();
        state.stats.jobs_completed += 1;
        drop(state);

        self.cancellation.unregister(job_id);
    }

    /// Cancel a single job, queued or running.
    ///
    /// Returns `true` if the job was known to the scheduler.
    pub fn cancel_job(&self, job_id: JobId) -> bool {
        let token_cancelled = self.cancellation.cancel(job_id);
        let removed = self.queue.remove_if(|job| job.id == job_id);

        if removed > 0 {
            let mut state = self.state.lock().unwrap();
            state.stats.jobs_cancelled += removed as u64;
            drop(state);

            self.cancellation.unregister(job_id);
            true
        } else {
            token_cancelled
        }
    }

    /// Look up the cancellation token for a job.
    pub fn cancellation_token(&self, job_id: JobId) -> Option<CancellationToken> {
        self.cancellation.get(job_id)
    }

    /// Number of queued jobs across both lanes.
    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }

    /// Whether any queued or running job remains.
    pub fn is_busy(&self) -> bool {
        !self.queue.is_empty() || !self.cancellation.is_empty()
    }

    /// Cancel everything in both lanes.
    pub fn clear(&self) {
        let cancelled = self.queue.len();
        self.cancellation.cancel_all();
        self.queue.clear();

        if cancelled > 0 {
            let mut state = self.state.lock().unwrap();
            state.stats.jobs_cancelled += cancelled as u64;
        }
        self.cancellation.clear();
    }

    /// Scheduler statistics snapshot.
    pub fn stats(&self) -> LoadSchedulerStats {
        let state = self.state.lock().unwrap();
        let mut stats = state.stats;
        stats.queue_size = self.queue.len();
        stats
    }
}

impl Default for LoadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_and_drain() {
        let scheduler = LoadScheduler::new();

        scheduler.submit_view(&[4, 5]);
        scheduler.submit_ahead(&[6, 7]);
        assert_eq!(scheduler.pending_jobs(), 4);

        let order: Vec<u32> = std::iter::from_fn(|| scheduler.next_job())
            .map(|job| job.page_index)
            .collect();
        assert_eq!(order, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_new_batch_replaces_lane() {
        let scheduler = LoadScheduler::new();

        let old_ids = scheduler.submit_ahead(&[6, 7]);
        let old_tokens: Vec<_> = old_ids
            .iter()
            .map(|&id| scheduler.cancellation_token(id).unwrap())
            .collect();

        scheduler.submit_ahead(&[4, 3]);

        // The stale batch is gone and its tokens are cancelled.
        for token in &old_tokens {
            assert!(token.is_cancelled());
        }
        let order: Vec<u32> = std::iter::from_fn(|| scheduler.next_job())
            .map(|job| job.page_index)
            .collect();
        assert_eq!(order, vec![4, 3]);

        let stats = scheduler.stats();
        assert_eq!(stats.jobs_submitted, 4);
        assert_eq!(stats.jobs_cancelled, 2);
    }

    #[test]
    fn test_replacing_one_lane_keeps_the_other() {
        let scheduler = LoadScheduler::new();

        scheduler.submit_view(&[5]);
        scheduler.submit_ahead(&[6, 7]);
        scheduler.submit_ahead(&[8]);

        let order: Vec<u32> = std::iter::from_fn(|| scheduler.next_job())
            .map(|job| job.page_index)
            .collect();
        assert_eq!(order, vec![5, 8]);
    }

    #[test]
    fn test_complete_job() {
        let scheduler = LoadScheduler::new();
        let ids = scheduler.submit_view(&[1]);

        let job = scheduler.next_job().unwrap();
        assert_eq!(job.id, ids[0]);
        assert!(scheduler.is_busy());

        scheduler.complete_job(job.id);
        assert!(!scheduler.is_busy());

        let stats = scheduler.stats();
        assert_eq!(stats.jobs_completed, 1);
        assert_eq!(stats.pending_jobs(), 0);
    }

    #[test]
    fn test_cancel_running_job() {
        let scheduler = LoadScheduler::new();
        let ids = scheduler.submit_view(&[1]);

        // Job is running: popped but not completed.
        let job = scheduler.next_job().unwrap();
        let token = scheduler.cancellation_token(job.id).unwrap();

        assert!(scheduler.cancel_job(ids[0]));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_unknown_job() {
        let scheduler = LoadScheduler::new();
        assert!(!scheduler.cancel_job(999));
    }

    #[test]
    fn test_clear() {
        let scheduler = LoadScheduler::new();
        let view_ids = scheduler.submit_view(&[1, 2]);
        let token = scheduler.cancellation_token(view_ids[0]).unwrap();

        scheduler.clear();
        assert_eq!(scheduler.pending_jobs(), 0);
        assert!(!scheduler.is_busy());
        assert!(token.is_cancelled());

        let stats = scheduler.stats();
        assert_eq!(stats.jobs_cancelled, 2);
    }

    #[test]
    fn test_empty_batch_still_replaces() {
        let scheduler = LoadScheduler::new();
        scheduler.submit_ahead(&[6, 7]);

        let ids = scheduler.submit_ahead(&[]);
        assert!(ids.is_empty());
        assert_eq!(scheduler.pending_jobs(), 0);
    }

    #[test]
    fn test_stats_queue_size() {
        let scheduler = LoadScheduler::new();
        scheduler.submit_view(&[1, 2, 3]);

        assert_eq!(scheduler.stats().queue_size, 3);
        scheduler.next_job();
        assert_eq!(scheduler.stats().queue_size, 2);
    }
}
