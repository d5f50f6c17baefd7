//! View generation session
//!
//! One session per requested view range. A background producer walks forward
//! from the view window through the lookahead horizon, publishing each
//! collection as soon as its pages are ready. Starting a new session
//! replaces the previous one wholesale; a replaced session abandons whatever
//! it was doing without publishing partial results.

use crate::layout::ViewWindowBuilder;
use crate::position::PageRange;
use crate::view_source::ViewContentSourceCollection;
use book_viewer_scheduler::{CancellationToken, Latch, LatchWait, ReleaseGate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Half pages beyond the requested view range that the producer may still
/// publish for. Collections past this horizon end the session.
const CONTENT_HORIZON_PARTS: i32 = 10;

/// Publication callback: the collection plus its force-resize flag.
pub type PublishFn = Arc<dyn Fn(Arc<ViewContentSourceCollection>, bool) + Send + Sync>;

enum Step {
    /// The horizon is exhausted; the producer stops.
    Exhausted,

    /// The cursor collection is not fully loaded yet; wait for a release.
    NotReady,

    /// A collection is ready to publish.
    Publish {
        collection: ViewContentSourceCollection,
        first: bool,
    },
}

struct SessionState {
    cursor: PageRange,
    publish_count: u64,
}

struct SessionShared {
    builder: ViewWindowBuilder,
    view_range: PageRange,
    content_range: PageRange,
    state: Mutex<SessionState>,
    gate: ReleaseGate,
    latch: Latch,
    token: CancellationToken,
    running: AtomicBool,
    on_view: PublishFn,
    on_next: PublishFn,
}

impl SessionShared {
    fn step(&self) -> Step {
        let mut state = self.state.lock().unwrap();
        let collection = self.builder.build(&state.cursor);

        if collection.is_empty() || !self.content_range.contains(collection.range().last()) {
            return Step::Exhausted;
        }
        if !collection.is_valid() {
            return Step::NotReady;
        }

        let direction = state.cursor.direction();
        state.cursor = collection.range().next(direction);
        let first = state.publish_count == 0;
        state.publish_count += 1;
        Step::Publish { collection, first }
    }

    fn run(&self) {
        'gate: while !self.token.is_cancelled() {
            if !self.gate.wait(&self.token) {
                break;
            }
            loop {
                if self.token.is_cancelled() {
                    break 'gate;
                }
                match self.step() {
                    Step::Exhausted => break 'gate,
                    Step::NotReady => continue 'gate,
                    Step::Publish { collection, first } => {
                        if self.token.is_cancelled() {
                            break 'gate;
                        }
                        let collection = Arc::new(collection);
                        if first {
                            (self.on_view)(Arc::clone(&collection), true);
                            self.latch.open();
                        }
                        (self.on_next)(collection, first);
                    }
                }
            }
        }
        self.running.store(false, Ordering::Release);
    }
}

/// Cheap handle onto a running session
///
/// Lets the orchestrator wake, wait on and force-publish the session without
/// holding its owning slot locked.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    /// Wake the producer: a move request or a finished page decode.
    pub fn release_gate(&self) {
        self.shared.gate.release();
    }

    /// Wait for the session's first published content, bounded by `timeout`
    /// and linked to the session's cancellation.
    pub fn wait_first_content(&self, timeout: Duration) -> LatchWait {
        let wait_token = self.shared.token.child();
        self.shared.latch.wait_timeout(timeout, &wait_token)
    }

    /// Publish the view window synchronously from whatever is available.
    ///
    /// The timeout fallback: the emitted collection may not be valid yet.
    /// The producer's own one-time view publication is unaffected.
    pub fn force_publish_view(&self) {
        if self.shared.token.is_cancelled() {
            return;
        }
        let collection = self.shared.builder.build(&self.shared.view_range);
        let first = {
            let state = self.shared.state.lock().unwrap();
            state.publish_count == 0
        };
        log::debug!(
            "forced view publish for {} (valid: {})",
            collection.range(),
            collection.is_valid()
        );
        (self.shared.on_view)(Arc::new(collection), first);
    }

    /// Whether the producer loop is still alive.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// The requested view range this session serves.
    pub fn view_range(&self) -> PageRange {
        self.shared.view_range
    }
}

/// One run of the producer loop for a single requested view range
///
/// Owns the background thread. Disposal cancels the session, wakes every
/// waiter and joins the thread; it is safe to call more than once and runs
/// again on drop.
pub struct ViewSession {
    shared: Arc<SessionShared>,
    thread: Option<JoinHandle<()>>,
}

impl ViewSession {
    /// Start a session for the view range plus its lookahead ranges.
    ///
    /// The producer sleeps until the first gate release.
    pub fn start(
        builder: ViewWindowBuilder,
        view_range: PageRange,
        ahead_ranges: &[PageRange],
        on_view: PublishFn,
        on_next: PublishFn,
    ) -> Self {
        let merged = ahead_ranges
            .iter()
            .fold(view_range, |acc, range| acc.add(range));
        let content_range = merged.clamp(
            view_range.min() - CONTENT_HORIZON_PARTS,
            view_range.max() + CONTENT_HORIZON_PARTS,
        );

        let shared = Arc::new(SessionShared {
            builder,
            view_range,
            content_range,
            state: Mutex::new(SessionState {
                cursor: view_range,
                publish_count: 0,
            }),
            gate: ReleaseGate::new(),
            latch: Latch::new(),
            token: CancellationToken::new(),
            running: AtomicBool::new(true),
            on_view,
            on_next,
        });

        let thread = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("view-producer".to_string())
                .spawn(move || shared.run())
                .expect("failed to spawn view producer")
        };

        Self {
            shared,
            thread: Some(thread),
        }
    }

    /// A cheap handle for waking and waiting without holding the session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Whether the producer loop is still alive.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Cancel the session and join the producer thread. Idempotent.
    pub fn dispose(&mut self) {
        self.shared.token.cancel();
        self.shared.gate.release();
        self.shared.latch.kick();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ViewSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
