//! Content slots produced by layout
//!
//! Layout turns a page range into an ordered list of content slots: which
//! page goes where, which half of it, and whether a slot is a synthetic
//! placeholder padding a two-up spread. A collection is consumed once by the
//! orchestrator and superseded whole, never patched.

use crate::page::Page;
use crate::position::{PagePosition, PageRange};
use std::sync::Arc;

/// Which part of a page a slot occupies
///
/// `part_size` is 1 for one half of a divided wide page, 2 for the whole
/// page. The position carries which half when the size is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePart {
    position: PagePosition,
    part_size: i32,
}

impl PagePart {
    /// A slot covering `part_size` half pages from `position`.
    pub fn new(position: PagePosition, part_size: i32) -> Self {
        Self {
            position,
            part_size,
        }
    }

    /// A slot covering the whole of the page at `index`.
    pub fn whole(index: i32) -> Self {
        Self::new(PagePosition::new(index, 0), 2)
    }

    /// The first covered half-page position.
    pub fn position(&self) -> PagePosition {
        self.position
    }

    /// How many half pages the slot covers: 1 or 2.
    pub fn part_size(&self) -> i32 {
        self.part_size
    }

    /// Whether the slot covers the whole page.
    pub fn is_whole(&self) -> bool {
        self.part_size == 2
    }

    /// The last covered half-page position.
    pub fn last_position(&self) -> PagePosition {
        self.position + (self.part_size - 1)
    }
}

/// One content slot: a page plus the part of it to display
#[derive(Debug, Clone)]
pub struct ViewContentSource {
    page: Arc<Page>,
    part: PagePart,
    is_dummy: bool,
}

impl ViewContentSource {
    /// A real content slot.
    pub fn new(page: Arc<Page>, part: PagePart) -> Self {
        Self {
            page,
            part,
            is_dummy: false,
        }
    }

    /// A synthetic placeholder slot padding a two-up spread.
    ///
    /// References the real page it pads so consumers can size it.
    pub fn dummy(page: Arc<Page>) -> Self {
        let part = PagePart::whole(page.index() as i32);
        Self {
            page,
            part,
            is_dummy: true,
        }
    }

    /// The page this slot displays (or pads, for a dummy).
    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// Which part of the page the slot occupies.
    pub fn part(&self) -> PagePart {
        self.part
    }

    /// Whether the slot is a synthetic placeholder.
    pub fn is_dummy(&self) -> bool {
        self.is_dummy
    }

    /// Whether the slot can display: dummies always can, real slots once
    /// their page's content is ready.
    pub fn is_ready(&self) -> bool {
        self.is_dummy || self.page.is_content_ready()
    }
}

/// The ordered slot list for one laid-out window
///
/// Carries the range it was built from; at most one collection is
/// authoritative at a time and superseding it is an atomic swap.
#[derive(Debug, Clone)]
pub struct ViewContentSourceCollection {
    range: PageRange,
    sources: Vec<ViewContentSource>,
}

impl ViewContentSourceCollection {
    /// The empty collection.
    pub fn empty() -> Self {
        Self {
            range: PageRange::empty(),
            sources: Vec::new(),
        }
    }

    /// A collection for the given laid-out range.
    pub fn new(range: PageRange, sources: Vec<ViewContentSource>) -> Self {
        Self { range, sources }
    }

    /// The range this collection was built from.
    pub fn range(&self) -> PageRange {
        self.range
    }

    /// The ordered content slots.
    pub fn sources(&self) -> &[ViewContentSource] {
        &self.sources
    }

    /// Whether the collection has no slots.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Whether every slot can display.
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && self.sources.iter().all(ViewContentSource::is_ready)
    }

    /// The real (non-dummy) pages in slot order.
    pub fn pages(&self) -> Vec<Arc<Page>> {
        self.sources
            .iter()
            .filter(|source| !source.is_dummy())
            .map(|source| Arc::clone(source.page()))
            .collect()
    }

    /// The page indexes of the real slots, in slot order.
    pub fn page_indexes(&self) -> Vec<u32> {
        self.sources
            .iter()
            .filter(|source| !source.is_dummy())
            .map(|source| source.page().index())
            .collect()
    }
}
