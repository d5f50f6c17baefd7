//! Window layout
//!
//! Turns a page range into the ordered content slots for one view frame,
//! applying the wide-page, solo-page, divide-page and dummy-page rules.
//! Layout is pure: the same book, configuration and range always produce
//! the same collection.

use crate::config::{BookViewConfig, PageMode, ReadOrder};
use crate::page::{Page, PageKind, PageList};
use crate::position::PageRange;
use crate::view_source::{PagePart, ViewContentSource, ViewContentSourceCollection};
use std::sync::Arc;

/// Computes content slots for view windows
///
/// # Example
///
/// ```
/// use book_viewer_core::{
///     BookViewConfig, Page, PageKind, PageList, PagePosition, PageRange, ViewWindowBuilder,
/// };
/// use std::sync::Arc;
///
/// let book = Arc::new(PageList::new(
///     (0..10).map(|i| Page::new(i, format!("{i}.jpg"), 800, 1200, PageKind::Image)).collect(),
/// ));
/// let builder = ViewWindowBuilder::new(book, BookViewConfig::default());
///
/// let collection = builder.build(&PageRange::new(PagePosition::new(5, 0), 1, 1));
/// assert_eq!(collection.page_indexes(), vec![5]);
/// ```
pub struct ViewWindowBuilder {
    book: Arc<PageList>,
    config: BookViewConfig,
}

impl ViewWindowBuilder {
    /// Create a builder for the given book and settings snapshot.
    pub fn new(book: Arc<PageList>, config: BookViewConfig) -> Self {
        Self { book, config }
    }

    /// The book this builder lays out.
    pub fn book(&self) -> &Arc<PageList> {
        &self.book
    }

    /// Lay out the content slots for a window.
    ///
    /// An empty range, or one outside the book, yields the empty collection.
    pub fn build(&self, range: &PageRange) -> ViewContentSourceCollection {
        if range.is_empty() || !self.book.is_valid_position(range.position()) {
            return ViewContentSourceCollection::empty();
        }

        let frame_size = self.config.frame_size();
        let direction = range.direction();

        // Walk slots from the range position. A divided wide page consumes
        // one half-page part; anything else consumes the whole page, with
        // the position snapped to part 0.
        let mut position = range.position();
        let mut slots: Vec<(Arc<Page>, PagePart)> = Vec::with_capacity(frame_size as usize);
        for _ in 0..frame_size {
            if !self.book.is_valid_index(position.index()) {
                break;
            }
            let Some(page) = self.book.page(position.index()) else {
                break;
            };
            let page = Arc::clone(page);
            let part = if self.can_divide(&page) {
                PagePart::new(position, 1)
            } else {
                PagePart::whole(position.index())
            };
            position = if direction > 0 {
                part.position() + part.part_size()
            } else {
                part.position() - 1
            };
            slots.push((page, part));
        }

        if slots.is_empty() {
            return ViewContentSourceCollection::empty();
        }

        // A solo page collapses a two-up spread to its first slot.
        if frame_size == 2
            && slots.len() == 2
            && slots.iter().any(|(page, _)| self.is_solo(page))
        {
            slots.truncate(1);
        }

        let covered = Self::covered_range(&slots, direction);

        let mut sources: Vec<ViewContentSource> = slots
            .iter()
            .map(|(page, part)| ViewContentSource::new(Arc::clone(page), *part))
            .collect();
        if direction < 0 {
            sources.reverse();
        }

        self.insert_dummy(&mut sources, frame_size);

        if self.config.read_order == ReadOrder::LeftToRight {
            sources.reverse();
        }

        merge_same_page(&mut sources);

        ViewContentSourceCollection::new(covered, sources)
    }

    /// Whether the page splits into half pages under the current settings.
    fn can_divide(&self, page: &Page) -> bool {
        self.config.page_mode == PageMode::Single
            && self.config.divide_wide_page
            && page.kind() != PageKind::Media
            && page.is_wide(self.config.wide_page_ratio)
    }

    /// Whether the page must stand alone in a two-up spread.
    fn is_solo(&self, page: &Page) -> bool {
        let index = page.index() as i32;
        let last = self.book.len() as i32 - 1;
        (self.config.solo_first_page && index == 0)
            || (self.config.solo_last_page && index == last)
            || page.kind() == PageKind::Folder
            || (self.config.solo_wide_page && page.is_wide(self.config.wide_page_ratio))
    }

    /// Pad a lone boundary page with a synthetic slot to keep the two-up
    /// layout symmetric.
    fn insert_dummy(&self, sources: &mut Vec<ViewContentSource>, frame_size: i32) {
        if frame_size != 2 || !self.config.insert_dummy_page || sources.len() != 1 {
            return;
        }
        let page = Arc::clone(sources[0].page());
        let index = page.index() as i32;
        let last = self.book.len() as i32 - 1;
        if self.is_solo(&page) || (index == 0 && index == last) {
            return;
        }
        if index == 0 {
            sources.insert(0, ViewContentSource::dummy(page));
        } else if index == last {
            sources.push(ViewContentSource::dummy(page));
        }
    }

    /// The half-page positions the slots actually cover, anchored for the
    /// walk direction so that `next(direction)` lands just beyond them.
    fn covered_range(slots: &[(Arc<Page>, PagePart)], direction: i32) -> PageRange {
        let mut min = slots[0].1.position();
        let mut max = slots[0].1.last_position();
        for (_, part) in slots {
            min = min.min(part.position());
            max = max.max(part.last_position());
        }
        let anchor = if direction > 0 { min } else { max };
        PageRange::from_parts(anchor, direction, max.value() - min.value() + 1)
    }
}

/// Collapse two slots addressing the same page into one whole-page entry.
fn merge_same_page(sources: &mut Vec<ViewContentSource>) {
    if sources.len() == 2
        && !sources[0].is_dummy()
        && !sources[1].is_dummy()
        && sources[0].page().index() == sources[1].page().index()
    {
        let page = Arc::clone(sources[0].page());
        let part = PagePart::whole(page.index() as i32);
        *sources = vec![ViewContentSource::new(page, part)];
    }
}
