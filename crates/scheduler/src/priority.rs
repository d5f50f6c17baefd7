//! Two-lane priority queue for page load jobs
//!
//! Decode work runs in two lanes: the view lane (pages on screen, must load
//! first) and the ahead lane (lookahead prefetch). Within a lane, jobs keep
//! the order they were submitted in, so a batch loads front-to-back.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

/// Priority lane for a page load job
///
/// Higher lanes are drained first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobLane {
    /// Lookahead prefetch (loads when the view lane is idle)
    Ahead = 0,

    /// Pages in the visible window (highest priority)
    View = 1,
}

/// Unique job identifier
pub type JobId = u64;

/// A page load order in the queue
///
/// Jobs are ordered lane-major, FIFO within a lane.
#[derive(Debug, Clone)]
pub struct LoadJob {
    /// Unique job identifier
    pub id: JobId,

    /// Priority lane
    pub lane: JobLane,

    /// Index of the page to load
    pub page_index: u32,

    /// Insertion order, for FIFO within the same lane
    insertion_order: u64,
}

impl LoadJob {
    fn new(id: JobId, lane: JobLane, page_index: u32, insertion_order: u64) -> Self {
        Self {
            id,
            lane,
            page_index,
            insertion_order,
        }
    }
}

impl PartialEq for LoadJob {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LoadJob {}

impl PartialOrd for LoadJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LoadJob {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.lane.cmp(&other.lane) {
            // BinaryHeap is a max heap, so invert the insertion order to get
            // FIFO within a lane.
            Ordering::Equal => other.insertion_order.cmp(&self.insertion_order),
            lane_order => lane_order,
        }
    }
}

/// Lane-ordered job queue
///
/// Thread-safe queue backing the load scheduler. View-lane jobs always come
/// out before ahead-lane jobs; within a lane, submission order is preserved.
pub struct JobQueue {
    state: Mutex<QueueState>,
}

struct QueueState {
    heap: BinaryHeap<LoadJob>,
    next_job_id: JobId,
    insertion_counter: u64,
}

impl JobQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_job_id: 1,
                insertion_counter: 0,
            }),
        }
    }

    /// Enqueue a load order for a page. Returns the assigned job id.
    pub fn push(&self, lane: JobLane, page_index: u32) -> JobId {
        let mut state = self.state.lock().unwrap();
        let job_id = state.next_job_id;
        state.next_job_id += 1;

        let insertion_order = state.insertion_counter;
        state.insertion_counter += 1;

        state
            .heap
            .push(LoadJob::new(job_id, lane, page_index, insertion_order));
        job_id
    }

    /// Dequeue the highest-priority job, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<LoadJob> {
        let mut state = self.state.lock().unwrap();
        state.heap.pop()
    }

    /// Look at the next job without removing it.
    pub fn peek(&self) -> Option<LoadJob> {
        let state = self.state.lock().unwrap();
        state.heap.peek().cloned()
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.heap.is_empty()
    }

    /// Drop every queued job.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.heap.clear();
    }

    /// Remove all jobs matching a predicate. Returns how many were removed.
    pub fn remove_if<F>(&self, predicate: F) -> usize
    where
        F: Fn(&LoadJob) -> bool,
    {
        let mut state = self.state.lock().unwrap();
        let original_len = state.heap.len();

        let mut remaining = Vec::with_capacity(original_len);
        while let Some(job) = state.heap.pop() {
            if !predicate(&job) {
                remaining.push(job);
            }
        }
        state.heap = remaining.into_iter().collect();

        original_len - state.heap.len()
    }

    /// Snapshot of the queued jobs, in arbitrary order.
    pub fn jobs(&self) -> Vec<LoadJob> {
        let state = self.state.lock().unwrap();
        state.heap.iter().cloned().collect()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_ordering() {
        assert!(JobLane::View > JobLane::Ahead);
    }

    #[test]
    fn test_queue_push_pop() {
        let queue = JobQueue::new();
        assert!(queue.is_empty());

        let id = queue.push(JobLane::View, 3);
        assert_eq!(queue.len(), 1);

        let job = queue.pop().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.lane, JobLane::View);
        assert_eq!(job.page_index, 3);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_view_lane_drains_first() {
        let queue = JobQueue::new();

        queue.push(JobLane::Ahead, 6);
        queue.push(JobLane::Ahead, 7);
        queue.push(JobLane::View, 5);

        assert_eq!(queue.pop().unwrap().page_index, 5);
        assert_eq!(queue.pop().unwrap().page_index, 6);
        assert_eq!(queue.pop().unwrap().page_index, 7);
    }

    #[test]
    fn test_fifo_within_lane() {
        let queue = JobQueue::new();

        // A lookahead batch must load front-to-back.
        for page in [6, 7, 4, 3] {
            queue.push(JobLane::Ahead, page);
        }

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop())
            .map(|job| job.page_index)
            .collect();
        assert_eq!(order, vec![6, 7, 4, 3]);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let queue = JobQueue::new();
        let id = queue.push(JobLane::View, 0);

        assert_eq!(queue.peek().unwrap().id, id);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_if_lane() {
        let queue = JobQueue::new();

        queue.push(JobLane::View, 1);
        queue.push(JobLane::Ahead, 2);
        queue.push(JobLane::Ahead, 3);

        let removed = queue.remove_if(|job| job.lane == JobLane::Ahead);
        assert_eq!(removed, 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().page_index, 1);
    }

    #[test]
    fn test_remove_if_preserves_order_of_rest() {
        let queue = JobQueue::new();

        queue.push(JobLane::View, 1);
        queue.push(JobLane::View, 2);
        queue.push(JobLane::View, 3);

        queue.remove_if(|job| job.page_index == 2);

        assert_eq!(queue.pop().unwrap().page_index, 1);
        assert_eq!(queue.pop().unwrap().page_index, 3);
    }

    #[test]
    fn test_clear() {
        let queue = JobQueue::new();
        queue.push(JobLane::View, 1);
        queue.push(JobLane::Ahead, 2);

        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_jobs_snapshot() {
        let queue = JobQueue::new();
        queue.push(JobLane::View, 1);
        queue.push(JobLane::Ahead, 2);

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().any(|j| j.lane == JobLane::View));
        assert!(jobs.iter().any(|j| j.lane == JobLane::Ahead));
    }
}
