//! Page view orchestration
//!
//! The public entry point of the pipeline: move to a position, move by a
//! step, refresh. Owns the authoritative view collection, the kept-page
//! set, and the single active generation session, and republishes the
//! session's results to the outside.

use crate::config::BookViewConfig;
use crate::events::{NextContentsEvent, Notifier, PageTerminatedEvent, Subscription, ViewContentsEvent};
use crate::layout::ViewWindowBuilder;
use crate::loader::PageLoadRequester;
use crate::page::{Page, PageList, PagePictureElement, PageSourceElement, PageState};
use crate::position::PageRange;
use crate::session::{PublishFn, ViewSession};
use crate::view_source::ViewContentSourceCollection;
use book_viewer_cache::BookMemoryService;
use book_viewer_scheduler::LatchWait;
use std::sync::{Arc, Mutex};

struct ViewerState {
    current: Option<Arc<ViewContentSourceCollection>>,
    current_range: PageRange,
    kept_pages: Vec<Arc<Page>>,
    displayed_once: bool,
}

/// Coordinates view updates for one open book
///
/// All collaborators are injected: the page sequence, the memory budget
/// tracker, and the decode-job system behind [`PageLoadRequester`]. Requests
/// come from the interactive thread; the heavy lifting happens in the
/// background session, bounded by the configured visibility timeouts.
///
/// # Example
///
/// ```no_run
/// use book_viewer_cache::BookMemoryService;
/// use book_viewer_core::{
///     BookViewConfig, Page, PageKind, PageList, PagePosition, PageRange, PageViewOrchestrator,
/// };
/// use book_viewer_scheduler::LoadScheduler;
/// use std::sync::Arc;
///
/// let book = Arc::new(PageList::new(
///     (0..10).map(|i| Page::new(i, format!("{i}.jpg"), 800, 1200, PageKind::Image)).collect(),
/// ));
/// let viewer = PageViewOrchestrator::new(
///     book,
///     BookViewConfig::default(),
///     Arc::new(BookMemoryService::default()),
///     Arc::new(LoadScheduler::new()),
/// );
///
/// let _subscription = viewer.subscribe_view_contents(|event| {
///     println!("now showing {}", event.collection.range());
/// });
/// viewer.update_view_page(PageRange::new(PagePosition::new(5, 0), 1, 1));
/// ```
pub struct PageViewOrchestrator {
    book: Arc<PageList>,
    config: Mutex<BookViewConfig>,
    memory: Arc<BookMemoryService>,
    loader: Arc<dyn PageLoadRequester>,
    view_notifier: Notifier<ViewContentsEvent>,
    next_notifier: Notifier<NextContentsEvent>,
    terminated_notifier: Notifier<PageTerminatedEvent>,
    session: Mutex<Option<ViewSession>>,
    state: Arc<Mutex<ViewerState>>,
}

impl PageViewOrchestrator {
    /// Create an orchestrator for the given book and collaborators.
    pub fn new(
        book: Arc<PageList>,
        config: BookViewConfig,
        memory: Arc<BookMemoryService>,
        loader: Arc<dyn PageLoadRequester>,
    ) -> Self {
        let current_range = if book.is_empty() {
            PageRange::empty()
        } else {
            PageRange::new(book.first_position(), 1, config.frame_size())
        };
        Self {
            book,
            config: Mutex::new(config),
            memory,
            loader,
            view_notifier: Notifier::new(),
            next_notifier: Notifier::new(),
            terminated_notifier: Notifier::new(),
            session: Mutex::new(None),
            state: Arc::new(Mutex::new(ViewerState {
                current: None,
                current_range,
                kept_pages: Vec::new(),
                displayed_once: false,
            })),
        }
    }

    /// Subscribe to authoritative view-window changes.
    pub fn subscribe_view_contents<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ViewContentsEvent) + Send + Sync + 'static,
    {
        self.view_notifier.subscribe(listener)
    }

    /// Subscribe to incremental lookahead publications.
    pub fn subscribe_next_contents<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&NextContentsEvent) + Send + Sync + 'static,
    {
        self.next_notifier.subscribe(listener)
    }

    /// Subscribe to out-of-bounds move signals.
    pub fn subscribe_page_terminated<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PageTerminatedEvent) + Send + Sync + 'static,
    {
        self.terminated_notifier.subscribe(listener)
    }

    /// The current settings snapshot.
    pub fn config(&self) -> BookViewConfig {
        self.config.lock().unwrap().clone()
    }

    /// Replace the settings. Takes effect on the next update or
    /// [`refresh_view_page`](Self::refresh_view_page).
    pub fn set_config(&self, config: BookViewConfig) {
        *self.config.lock().unwrap() = config;
    }

    /// The authoritative view collection, if one has been published.
    pub fn current_view(&self) -> Option<Arc<ViewContentSourceCollection>> {
        self.state.lock().unwrap().current.clone()
    }

    /// Indexes of the pages currently kept in memory: the view window plus
    /// the lookahead horizon.
    pub fn kept_page_indexes(&self) -> Vec<u32> {
        let state = self.state.lock().unwrap();
        state.kept_pages.iter().map(|page| page.index()).collect()
    }

    /// Whether lookahead loading or the producer loop is still active.
    pub fn is_busy(&self) -> bool {
        if self.loader.is_busy() {
            return true;
        }
        let slot = self.session.lock().unwrap();
        slot.as_ref().map(ViewSession::is_running).unwrap_or(false)
    }

    /// Move the view to the requested range.
    ///
    /// Out-of-bounds positions emit a page-terminated signal instead of a
    /// view; an empty book emits an empty view collection. Otherwise a new
    /// generation session starts (replacing any previous one) and the call
    /// returns once the first content is visible or the visibility timeout
    /// has forced a best-effort publish.
    pub fn update_view_page(&self, range: PageRange) {
        let config = self.config.lock().unwrap().clone();

        if self.book.is_empty() {
            self.view_notifier.emit(&ViewContentsEvent {
                collection: Arc::new(ViewContentSourceCollection::empty()),
                is_force_resize: false,
                is_first_of_book: false,
            });
            return;
        }
        if range.position() < self.book.first_position() {
            log::debug!("move before the first page, terminating backward");
            self.terminated_notifier
                .emit(&PageTerminatedEvent { direction: -1, range });
            return;
        }
        if range.position() > self.book.last_position() {
            log::debug!("move past the last page, terminating forward");
            self.terminated_notifier
                .emit(&PageTerminatedEvent { direction: 1, range });
            return;
        }

        let frame_size = config.frame_size();
        let direction = range.direction();

        // The literal pages the new window touches, with clamped lookups so
        // oversized steps degrade to the boundary page.
        let mut view_pages: Vec<Arc<Page>> = Vec::with_capacity(frame_size as usize);
        for i in 0..frame_size {
            let number = self
                .book
                .clamp_page_number(range.position().index() + direction * i);
            if let Some(page) = self.book.page(number) {
                if !view_pages.iter().any(|p| p.index() == page.index()) {
                    view_pages.push(Arc::clone(page));
                }
            }
        }

        let ahead_ranges = self.create_ahead_ranges(&range, &config);
        let ahead_pages = self.pages_in_ranges(&ahead_ranges);

        let displayed_once;
        {
            let mut state = self.state.lock().unwrap();

            // Pages leaving the view set become evictable again; the new
            // view pages are pinned.
            for page in &state.kept_pages {
                if !view_pages.iter().any(|p| p.index() == page.index()) {
                    page.set_state(PageState::None);
                }
            }
            for page in &view_pages {
                page.set_state(PageState::View);
            }

            let mut kept = view_pages.clone();
            for page in &ahead_pages {
                if !kept.iter().any(|p| p.index() == page.index()) {
                    kept.push(Arc::clone(page));
                }
            }
            state.kept_pages = kept;
            state.current_range = range;
            displayed_once = state.displayed_once;
        }

        // The first view of a book may take longer: nothing is cached yet.
        let timeout = if config.prioritize_page_move && displayed_once {
            config.page_move_timeout
        } else {
            config.first_view_timeout
        };

        // Replace the session. The old producer is cancelled and joined
        // before the new one starts, so at most one is ever alive.
        let handle = {
            let mut slot = self.session.lock().unwrap();
            if let Some(mut old) = slot.take() {
                old.dispose();
            }
            let builder = ViewWindowBuilder::new(Arc::clone(&self.book), config);
            let session = ViewSession::start(
                builder,
                range,
                &ahead_ranges,
                self.make_view_callback(),
                self.make_next_callback(),
            );
            let handle = session.handle();
            *slot = Some(session);
            handle
        };

        if let Some(first) = view_pages.first() {
            self.memory.set_reference(first.index());
        }
        let view_indexes: Vec<u32> = view_pages.iter().map(|page| page.index()).collect();
        let ahead_indexes: Vec<u32> = ahead_pages.iter().map(|page| page.index()).collect();
        self.loader.request_view(&view_indexes);
        self.loader.request_ahead(&ahead_indexes);

        handle.release_gate();

        match handle.wait_first_content(timeout) {
            LatchWait::Opened | LatchWait::Cancelled => {}
            LatchWait::TimedOut => {
                log::debug!("first content not visible within {:?}, forcing a publish", timeout);
                handle.force_publish_view();
                handle.release_gate();
            }
        }
    }

    /// Move relative to the current window.
    ///
    /// A step whose magnitude equals the frame size advances one whole
    /// frame; any other step moves by raw half pages. A step that would
    /// leave a still-unseen boundary page off-window clamps to the boundary
    /// instead of terminating.
    pub fn move_view_page(&self, step: i32) {
        let config = self.config.lock().unwrap().clone();
        let frame_size = config.frame_size();
        let direction = if step < 0 { -1 } else { 1 };
        let current = self.state.lock().unwrap().current_range;

        let mut position = if step.abs() == frame_size {
            current.next(direction).position()
        } else {
            current.position() + step
        };

        if position < self.book.first_position() && !current.contains(self.book.first_position()) {
            position = self.book.first_position();
        }
        if position > self.book.last_position() && !current.contains(self.book.last_position()) {
            position = self.book.last_position().truncated();
        }

        self.update_view_page(PageRange::new(position, direction, frame_size));
    }

    /// Re-request the current range, e.g. after a settings change.
    pub fn refresh_view_page(&self) {
        let current = self.state.lock().unwrap().current_range;
        let frame_size = self.config.lock().unwrap().frame_size();
        self.update_view_page(PageRange::new(
            current.position(),
            current.direction(),
            frame_size,
        ));
    }

    /// A page finished decoding: feed the memory tracker and wake the
    /// producer, which may have been waiting for exactly this page.
    pub fn page_loaded(&self, page: &Arc<Page>) {
        if page.source_size() > 0 {
            self.memory
                .add_source(Box::new(PageSourceElement::new(Arc::clone(page))));
        }
        if page.picture_size() > 0 {
            self.memory
                .add_picture(Box::new(PagePictureElement::new(Arc::clone(page))));
        }

        let handle = {
            let slot = self.session.lock().unwrap();
            slot.as_ref().map(ViewSession::handle)
        };
        if let Some(handle) = handle {
            handle.release_gate();
        }
    }

    fn make_view_callback(&self) -> PublishFn {
        let state = Arc::clone(&self.state);
        let notifier = self.view_notifier.clone();
        Arc::new(move |collection, is_force_resize| {
            let is_first_of_book = {
                let mut state = state.lock().unwrap();
                let first = !state.displayed_once;
                state.displayed_once = true;
                state.current = Some(Arc::clone(&collection));
                state.current_range = collection.range();
                first
            };
            notifier.emit(&ViewContentsEvent {
                collection,
                is_force_resize,
                is_first_of_book,
            });
        })
    }

    fn make_next_callback(&self) -> PublishFn {
        let notifier = self.next_notifier.clone();
        Arc::new(move |collection, is_force_resize| {
            notifier.emit(&NextContentsEvent {
                collection,
                is_force_resize,
            });
        })
    }

    /// Lookahead windows: the primary direction gets the preload budget
    /// first; whatever the sequence boundary leaves unspent goes to the
    /// opposite direction.
    fn create_ahead_ranges(&self, view: &PageRange, config: &BookViewConfig) -> Vec<PageRange> {
        if !config.preload_enabled || config.preload_size <= 0 {
            return Vec::new();
        }
        let budget_parts = config.preload_size * 2;

        let (primary, used) = self.ahead_range(view, view.direction(), budget_parts);
        let leftover = budget_parts - used;
        let (fallback, _) = self.ahead_range(view, -view.direction(), budget_parts + leftover);

        [primary, fallback]
            .into_iter()
            .filter(|range| !range.is_empty())
            .collect()
    }

    /// One lookahead window beyond the view in the given direction, capped
    /// by the sequence boundary. Returns the window and the half pages it
    /// consumed.
    fn ahead_range(&self, view: &PageRange, direction: i32, budget_parts: i32) -> (PageRange, i32) {
        if budget_parts <= 0 {
            return (PageRange::empty(), 0);
        }
        let start = view.next(direction).position();
        if !self.book.is_valid_position(start) {
            return (PageRange::empty(), 0);
        }
        let available = if direction > 0 {
            self.book.last_position().value() - start.value() + 1
        } else {
            start.value() - self.book.first_position().value() + 1
        };
        let parts = budget_parts.min(available);
        (PageRange::from_parts(start, direction, parts), parts)
    }

    /// The pages the given ranges cover, walk order, deduplicated.
    fn pages_in_ranges(&self, ranges: &[PageRange]) -> Vec<Arc<Page>> {
        let mut pages: Vec<Arc<Page>> = Vec::new();
        for range in ranges {
            let mut position = range.position();
            for _ in 0..range.parts() {
                if let Some(page) = self.book.page(position.index()) {
                    if !pages.iter().any(|p| p.index() == page.index()) {
                        pages.push(Arc::clone(page));
                    }
                }
                position = position + range.direction();
            }
        }
        pages
    }
}

impl Drop for PageViewOrchestrator {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.lock().unwrap().take() {
            session.dispose();
        }
    }
}
