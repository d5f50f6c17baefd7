//! Book Viewer Scheduler Library
//!
//! Page load scheduling with two priority lanes and cancellable workers.
//!
//! The page view pipeline submits ordered page batches into two lanes:
//! the view lane (pages on screen) and the ahead lane (lookahead prefetch).
//! Submitting a new batch replaces the lane's previous batch, so workers
//! never decode pages the user already navigated away from. The crate also
//! carries the cooperative-concurrency primitives the pipeline is built on:
//! cancellation tokens, the coalescing release gate, and the one-shot latch.
//!
//! # Example
//!
//! ```
//! use book_viewer_scheduler::{JobLane, LoadScheduler};
//!
//! let scheduler = LoadScheduler::new();
//!
//! // Page 5 is visible, pages 6 and 7 are lookahead.
//! scheduler.submit_view(&[5]);
//! scheduler.submit_ahead(&[6, 7]);
//!
//! // A worker drains the view lane first.
//! if let Some(job) = scheduler.next_job() {
//!     assert_eq!(job.lane, JobLane::View);
//!     // ... decode page job.page_index, checking the token ...
//!     scheduler.complete_job(job.id);
//! }
//! ```

mod cancel;
mod gate;
mod priority;
mod scheduler;
mod worker;

// Re-export public API
pub use cancel::{CancellationRegistry, CancellationToken};
pub use gate::{Latch, LatchWait, ReleaseGate};
pub use priority::{JobId, JobLane, JobQueue, LoadJob};
pub use scheduler::{LoadScheduler, LoadSchedulerStats};
pub use worker::{JobExecutor, LoaderPool, LoaderPoolConfig};
