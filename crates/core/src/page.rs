//! Pages and the ordered page sequence
//!
//! A page carries its archive entry name, its image geometry, and a content
//! cell that the decode side fills in and the memory pools drain again. The
//! pipeline never creates or destroys pages mid-session; it reads geometry
//! and kind, and writes the view state.

use crate::position::PagePosition;
use book_viewer_cache::MemoryElement;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Why a page's decode failed, recorded by the decode side.
///
/// A failed page is terminal: layout treats it as ready so the producer loop
/// never waits on it, and its slot simply carries no presentation content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageLoadError {
    /// The decoder rejected the entry.
    #[error("failed to decode {entry}: {reason}")]
    DecodeFailed { entry: String, reason: String },

    /// The entry disappeared from the archive.
    #[error("entry {entry} is missing from the archive")]
    EntryMissing { entry: String },
}

/// What kind of entry a page represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// A still image
    Image,

    /// An animation or video entry; never split into halves
    Media,

    /// A folder placeholder; always displays alone
    Folder,
}

/// View state of a page, written only by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Not part of the visible window; eligible for eviction
    None,

    /// Part of the visible window; pinned against eviction
    View,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ContentStatus {
    NotLoaded,
    Loaded,
    Failed(PageLoadError),
}

#[derive(Debug)]
struct ContentCell {
    status: ContentStatus,
    source_size: usize,
    picture_size: usize,
}

/// A single page of an open book
///
/// Thread-safe: the decode side fills the content cell, the memory pools
/// release it, the orchestrator toggles the view state, and layout reads
/// geometry, all concurrently.
#[derive(Debug)]
pub struct Page {
    index: u32,
    entry_name: String,
    width: u32,
    height: u32,
    kind: PageKind,
    state: Mutex<PageState>,
    content: Mutex<ContentCell>,
}

impl Page {
    /// Create a page with the given geometry.
    pub fn new(index: u32, entry_name: impl Into<String>, width: u32, height: u32, kind: PageKind) -> Self {
        Self {
            index,
            entry_name: entry_name.into(),
            width,
            height,
            kind,
            state: Mutex::new(PageState::None),
            content: Mutex::new(ContentCell {
                status: ContentStatus::NotLoaded,
                source_size: 0,
                picture_size: 0,
            }),
        }
    }

    /// Stable index in the book's page sequence.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Archive entry name.
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Entry kind.
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Whether the image counts as wide under the given aspect threshold.
    pub fn is_wide(&self, wide_ratio: f64) -> bool {
        f64::from(self.width) > f64::from(self.height) * wide_ratio
    }

    /// Current view state.
    pub fn state(&self) -> PageState {
        *self.state.lock().unwrap()
    }

    /// Set the view state. The orchestrator is the sole writer.
    pub fn set_state(&self, state: PageState) {
        *self.state.lock().unwrap() = state;
    }

    /// Record a finished decode with its content sizes.
    pub fn set_loaded(&self, source_size: usize, picture_size: usize) {
        let mut content = self.content.lock().unwrap();
        content.status = ContentStatus::Loaded;
        content.source_size = source_size;
        content.picture_size = picture_size;
    }

    /// Record a terminal decode failure.
    pub fn set_failed(&self, error: PageLoadError) {
        let mut content = self.content.lock().unwrap();
        content.status = ContentStatus::Failed(error);
        content.source_size = 0;
        content.picture_size = 0;
    }

    /// Whether layout may treat the page as ready: loaded, or failed
    /// terminally.
    pub fn is_content_ready(&self) -> bool {
        let content = self.content.lock().unwrap();
        !matches!(content.status, ContentStatus::NotLoaded)
    }

    /// Whether the page failed to decode.
    pub fn is_failed(&self) -> bool {
        let content = self.content.lock().unwrap();
        matches!(content.status, ContentStatus::Failed(_))
    }

    /// The recorded decode failure, if any.
    pub fn load_error(&self) -> Option<PageLoadError> {
        let content = self.content.lock().unwrap();
        match &content.status {
            ContentStatus::Failed(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Size of the raw decoded content in bytes.
    pub fn source_size(&self) -> usize {
        self.content.lock().unwrap().source_size
    }

    /// Size of the presentation picture in bytes.
    pub fn picture_size(&self) -> usize {
        self.content.lock().unwrap().picture_size
    }

    /// Drop the raw decoded content (pool eviction).
    pub fn release_source(&self) {
        let mut content = self.content.lock().unwrap();
        content.source_size = 0;
        Self::revert_if_drained(&mut content);
    }

    /// Drop the presentation picture (pool eviction).
    pub fn release_picture(&self) {
        let mut content = self.content.lock().unwrap();
        content.picture_size = 0;
        Self::revert_if_drained(&mut content);
    }

    // A fully drained page must be decoded again before it can display.
    fn revert_if_drained(content: &mut ContentCell) {
        if content.status == ContentStatus::Loaded
            && content.source_size == 0
            && content.picture_size == 0
        {
            content.status = ContentStatus::NotLoaded;
        }
    }
}

/// The raw decoded content of a page, as seen by the memory pools.
pub struct PageSourceElement {
    page: Arc<Page>,
}

impl PageSourceElement {
    /// Wrap a page's raw content for pool tracking.
    pub fn new(page: Arc<Page>) -> Self {
        Self { page }
    }
}

impl MemoryElement for PageSourceElement {
    fn page_index(&self) -> u32 {
        self.page.index()
    }

    fn content_size(&self) -> usize {
        self.page.source_size()
    }

    fn is_pinned(&self) -> bool {
        self.page.state() == PageState::View
    }

    fn release(&self) {
        self.page.release_source();
    }
}

/// The presentation picture of a page, as seen by the memory pools.
pub struct PagePictureElement {
    page: Arc<Page>,
}

impl PagePictureElement {
    /// Wrap a page's picture for pool tracking.
    pub fn new(page: Arc<Page>) -> Self {
        Self { page }
    }
}

impl MemoryElement for PagePictureElement {
    fn page_index(&self) -> u32 {
        self.page.index()
    }

    fn content_size(&self) -> usize {
        self.page.picture_size()
    }

    fn is_pinned(&self) -> bool {
        self.page.state() == PageState::View
    }

    fn release(&self) {
        self.page.release_picture();
    }
}

/// The ordered page sequence of an open book
///
/// Indexable, with clamped lookups so out-of-range step sizes degrade to the
/// nearest valid page instead of failing.
pub struct PageList {
    pages: Vec<Arc<Page>>,
}

impl PageList {
    /// Build the sequence from pages in order.
    ///
    /// Page indexes are renumbered to match their sequence position.
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(index, mut page)| {
                    page.index = index as u32;
                    Arc::new(page)
                })
                .collect(),
        }
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the book has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The first half-page position, or the empty sentinel for an empty
    /// book.
    pub fn first_position(&self) -> PagePosition {
        if self.pages.is_empty() {
            PagePosition::EMPTY
        } else {
            PagePosition::new(0, 0)
        }
    }

    /// The last half-page position, or the empty sentinel for an empty book.
    pub fn last_position(&self) -> PagePosition {
        if self.pages.is_empty() {
            PagePosition::EMPTY
        } else {
            PagePosition::new(self.pages.len() as i32 - 1, 1)
        }
    }

    /// Whether the index addresses a page.
    pub fn is_valid_index(&self, index: i32) -> bool {
        index >= 0 && (index as usize) < self.pages.len()
    }

    /// Whether the position lies inside the book.
    pub fn is_valid_position(&self, position: PagePosition) -> bool {
        !position.is_empty()
            && position >= self.first_position()
            && position <= self.last_position()
    }

    /// Clamp a page number into the valid index range.
    pub fn clamp_page_number(&self, index: i32) -> i32 {
        index.clamp(0, (self.pages.len() as i32 - 1).max(0))
    }

    /// Look up a page by index.
    pub fn page(&self, index: i32) -> Option<&Arc<Page>> {
        if self.is_valid_index(index) {
            self.pages.get(index as usize)
        } else {
            None
        }
    }

    /// Iterate over all pages in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Page>> {
        self.pages.iter()
    }
}
