//! Fixed-point page addressing
//!
//! Positions address half pages: a wide image split in two occupies two
//! consecutive positions of the same page index. All window arithmetic in
//! the view pipeline runs on these values.

use std::fmt;
use std::ops::{Add, Sub};

/// A half-page address inside a book
///
/// Stored as `index * 2 + part` with `part` 0 or 1. The order is total and
/// index-major; the part is the tiebreak within a page. Adding an integer
/// advances by half pages, so `+ 1` moves to the next half, not necessarily
/// the next page.
///
/// # Example
///
/// ```
/// use book_viewer_core::PagePosition;
///
/// let position = PagePosition::new(5, 0);
/// assert_eq!(position.index(), 5);
/// assert_eq!(position.part(), 0);
/// assert_eq!((position + 1).part(), 1);
/// assert_eq!((position + 2).index(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PagePosition {
    value: i32,
}

impl PagePosition {
    /// The "no position" sentinel.
    pub const EMPTY: PagePosition = PagePosition { value: -1 };

    /// Construct from a page index and a half-page part (0 or 1).
    pub fn new(index: i32, part: i32) -> Self {
        debug_assert!(part == 0 || part == 1);
        Self {
            value: index * 2 + part,
        }
    }

    /// Construct from a raw half-page value.
    pub fn from_value(value: i32) -> Self {
        Self { value }
    }

    /// The raw half-page value.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// The page index this position addresses.
    pub fn index(&self) -> i32 {
        self.value / 2
    }

    /// Which half of the page: 0 or 1.
    pub fn part(&self) -> i32 {
        self.value % 2
    }

    /// Whether this is the "no position" sentinel.
    pub fn is_empty(&self) -> bool {
        self.value < 0
    }

    /// Clamp into `[min, max]` instead of failing on out-of-range input.
    pub fn clamp(&self, min: PagePosition, max: PagePosition) -> Self {
        Self {
            value: self.value.clamp(min.value, max.value),
        }
    }

    /// The position snapped to the first half of its page.
    pub fn truncated(&self) -> Self {
        Self::new(self.index(), 0)
    }
}

impl Add<i32> for PagePosition {
    type Output = PagePosition;

    fn add(self, rhs: i32) -> PagePosition {
        PagePosition::from_value(self.value + rhs)
    }
}

impl Add<PagePosition> for PagePosition {
    type Output = PagePosition;

    fn add(self, rhs: PagePosition) -> PagePosition {
        PagePosition::from_value(self.value + rhs.value)
    }
}

impl Sub<i32> for PagePosition {
    type Output = PagePosition;

    fn sub(self, rhs: i32) -> PagePosition {
        PagePosition::from_value(self.value - rhs)
    }
}

impl Sub<PagePosition> for PagePosition {
    type Output = PagePosition;

    fn sub(self, rhs: PagePosition) -> PagePosition {
        PagePosition::from_value(self.value - rhs.value)
    }
}

impl fmt::Display for PagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "empty")
        } else if self.part() == 0 {
            write!(f, "{}", self.index())
        } else {
            write!(f, "{}.5", self.index())
        }
    }
}

/// A directional window of consecutive half-page positions
///
/// The window starts at `position` and spans `parts` half pages toward
/// `direction`. A new instance is produced every time the window advances;
/// ranges are never mutated in place.
///
/// # Example
///
/// ```
/// use book_viewer_core::{PagePosition, PageRange};
///
/// // One page forward from page 5: covers both halves of page 5.
/// let range = PageRange::new(PagePosition::new(5, 0), 1, 1);
/// assert_eq!(range.min(), PagePosition::new(5, 0));
/// assert_eq!(range.max(), PagePosition::new(5, 1));
///
/// // The window immediately after it starts at page 6.
/// assert_eq!(range.next(1).position(), PagePosition::new(6, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    position: PagePosition,
    direction: i32,
    parts: i32,
}

impl PageRange {
    /// The canonical empty range; short-circuits all layout.
    pub fn empty() -> Self {
        Self {
            position: PagePosition::EMPTY,
            direction: 1,
            parts: 0,
        }
    }

    /// A window of `page_size` whole pages from `position` toward
    /// `direction`.
    pub fn new(position: PagePosition, direction: i32, page_size: i32) -> Self {
        Self::from_parts(position, direction, page_size * 2)
    }

    /// A window of `parts` half pages from `position` toward `direction`.
    pub fn from_parts(position: PagePosition, direction: i32, parts: i32) -> Self {
        Self {
            position,
            direction: if direction < 0 { -1 } else { 1 },
            parts: parts.max(0),
        }
    }

    /// The window's anchor position.
    pub fn position(&self) -> PagePosition {
        self.position
    }

    /// The window's direction: +1 or -1.
    pub fn direction(&self) -> i32 {
        self.direction
    }

    /// Width in half pages.
    pub fn parts(&self) -> i32 {
        self.parts
    }

    /// Width in whole pages, rounding a trailing half up.
    pub fn page_size(&self) -> i32 {
        (self.parts + 1) / 2
    }

    /// Whether this is an empty window.
    pub fn is_empty(&self) -> bool {
        self.parts <= 0 || self.position.is_empty()
    }

    /// Lower bound of the covered positions.
    pub fn min(&self) -> PagePosition {
        if self.direction > 0 {
            self.position
        } else {
            self.position - (self.parts - 1)
        }
    }

    /// Upper bound of the covered positions.
    pub fn max(&self) -> PagePosition {
        if self.direction > 0 {
            self.position + (self.parts - 1)
        } else {
            self.position
        }
    }

    /// The bound on the direction side: `max` when moving forward, `min`
    /// when moving backward.
    pub fn last(&self) -> PagePosition {
        if self.direction > 0 {
            self.max()
        } else {
            self.min()
        }
    }

    /// The window immediately beyond this one in the given direction, with
    /// the same width.
    pub fn next(&self, direction: i32) -> PageRange {
        let position = if direction > 0 {
            self.max() + 1
        } else {
            self.min() - 1
        };
        Self::from_parts(position, direction, self.parts)
    }

    /// Shift the window by `step` half pages.
    pub fn move_by(&self, step: i32) -> PageRange {
        Self::from_parts(self.position + step, self.direction, self.parts)
    }

    /// Whether the window covers the given position.
    pub fn contains(&self, position: PagePosition) -> bool {
        !self.is_empty() && self.min() <= position && position <= self.max()
    }

    /// The bounding window of this range and another, keeping this range's
    /// direction. An empty operand contributes nothing.
    pub fn add(&self, other: &PageRange) -> PageRange {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let min = self.min().min(other.min());
        let max = self.max().max(other.max());
        Self::from_bounds(min, max, self.direction)
    }

    /// Clamp the covered positions into `[lo, hi]`.
    pub fn clamp(&self, lo: PagePosition, hi: PagePosition) -> PageRange {
        if self.is_empty() {
            return *self;
        }
        let min = self.min().clamp(lo, hi);
        let max = self.max().clamp(lo, hi);
        Self::from_bounds(min, max, self.direction)
    }

    /// Limit the width to at most `max_parts` half pages, anchored at the
    /// window's position.
    pub fn truncate(&self, max_parts: i32) -> PageRange {
        Self::from_parts(self.position, self.direction, self.parts.min(max_parts))
    }

    fn from_bounds(min: PagePosition, max: PagePosition, direction: i32) -> PageRange {
        let position = if direction > 0 { min } else { max };
        Self::from_parts(position, direction, max.value() - min.value() + 1)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[{}..{}{}]", self.min(), self.max(), if self.direction > 0 { ">" } else { "<" })
        }
    }
}
