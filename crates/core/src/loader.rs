//! Decode-job contract
//!
//! The orchestrator hands ordered page batches to whatever loads and decodes
//! them. The workspace scheduler implements the contract out of the box;
//! hosts with their own job system implement it instead.

use book_viewer_scheduler::LoadScheduler;

/// Where the pipeline sends its load orders
///
/// Batches are ordered: the front of the slice should load first. A new
/// batch for a lane supersedes the previous one.
pub trait PageLoadRequester: Send + Sync {
    /// Prioritize the pages of the visible window, in order.
    fn request_view(&self, pages: &[u32]);

    /// Queue the lookahead pages, in order of distance from the view.
    fn request_ahead(&self, pages: &[u32]);

    /// Whether load work is still pending or running.
    fn is_busy(&self) -> bool;
}

impl PageLoadRequester for LoadScheduler {
    fn request_view(&self, pages: &[u32]) {
        self.submit_view(pages);
    }

    fn request_ahead(&self, pages: &[u32]) {
        self.submit_ahead(pages);
    }

    fn is_busy(&self) -> bool {
        LoadScheduler::is_busy(self)
    }
}
