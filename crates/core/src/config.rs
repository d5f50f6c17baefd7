//! View configuration
//!
//! Read-only inputs to the pipeline, gathered from the host's settings.
//! Changing one of these takes effect on the next view refresh.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many pages a view frame shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageMode {
    /// One page per frame
    Single,

    /// Two-up spread
    Wide,
}

impl PageMode {
    /// Pages per frame: 1 or 2.
    pub fn frame_size(&self) -> i32 {
        match self {
            PageMode::Single => 1,
            PageMode::Wide => 2,
        }
    }
}

/// Reading direction of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadOrder {
    /// Right-to-left (default for manga-style books)
    RightToLeft,

    /// Left-to-right
    LeftToRight,
}

/// Settings consumed by the page view pipeline
///
/// # Example
///
/// ```
/// use book_viewer_core::{BookViewConfig, PageMode};
///
/// let config = BookViewConfig::default()
///     .with_page_mode(PageMode::Wide)
///     .with_preload_size(3);
/// assert_eq!(config.frame_size(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookViewConfig {
    /// Single page or two-up spread
    pub page_mode: PageMode,

    /// Reading direction
    pub read_order: ReadOrder,

    /// Split wide images into two half pages in single-page mode
    pub divide_wide_page: bool,

    /// Display the first page alone in two-up mode
    pub solo_first_page: bool,

    /// Display the last page alone in two-up mode
    pub solo_last_page: bool,

    /// Display wide images alone in two-up mode
    pub solo_wide_page: bool,

    /// Pad a lone boundary page with a synthetic placeholder in two-up mode
    pub insert_dummy_page: bool,

    /// A page counts as wide when width > height * this ratio
    pub wide_page_ratio: f64,

    /// Enable lookahead preloading
    pub preload_enabled: bool,

    /// Lookahead budget in pages per direction
    pub preload_size: i32,

    /// Use the short visibility timeout after the book's first view
    pub prioritize_page_move: bool,

    /// Visibility timeout for page moves once something is on screen
    pub page_move_timeout: Duration,

    /// Visibility timeout for the book's first view, where nothing is
    /// cached yet
    pub first_view_timeout: Duration,
}

impl Default for BookViewConfig {
    fn default() -> Self {
        Self {
            page_mode: PageMode::Single,
            read_order: ReadOrder::RightToLeft,
            divide_wide_page: false,
            solo_first_page: false,
            solo_last_page: false,
            solo_wide_page: false,
            insert_dummy_page: true,
            wide_page_ratio: 1.0,
            preload_enabled: true,
            preload_size: 2,
            prioritize_page_move: true,
            page_move_timeout: Duration::from_millis(100),
            first_view_timeout: Duration::from_millis(5000),
        }
    }
}

impl BookViewConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages per view frame under the current page mode.
    pub fn frame_size(&self) -> i32 {
        self.page_mode.frame_size()
    }

    /// Set the page mode.
    pub fn with_page_mode(mut self, page_mode: PageMode) -> Self {
        self.page_mode = page_mode;
        self
    }

    /// Set the reading direction.
    pub fn with_read_order(mut self, read_order: ReadOrder) -> Self {
        self.read_order = read_order;
        self
    }

    /// Enable or disable wide-page splitting in single-page mode.
    pub fn with_divide_wide_page(mut self, enabled: bool) -> Self {
        self.divide_wide_page = enabled;
        self
    }

    /// Force the first page to display alone in two-up mode.
    pub fn with_solo_first_page(mut self, enabled: bool) -> Self {
        self.solo_first_page = enabled;
        self
    }

    /// Force the last page to display alone in two-up mode.
    pub fn with_solo_last_page(mut self, enabled: bool) -> Self {
        self.solo_last_page = enabled;
        self
    }

    /// Force wide images to display alone in two-up mode.
    pub fn with_solo_wide_page(mut self, enabled: bool) -> Self {
        self.solo_wide_page = enabled;
        self
    }

    /// Enable or disable dummy-page padding in two-up mode.
    pub fn with_insert_dummy_page(mut self, enabled: bool) -> Self {
        self.insert_dummy_page = enabled;
        self
    }

    /// Set the wide-page aspect threshold.
    pub fn with_wide_page_ratio(mut self, ratio: f64) -> Self {
        self.wide_page_ratio = ratio;
        self
    }

    /// Enable or disable lookahead preloading.
    pub fn with_preload_enabled(mut self, enabled: bool) -> Self {
        self.preload_enabled = enabled;
        self
    }

    /// Set the lookahead budget in pages per direction.
    pub fn with_preload_size(mut self, pages: i32) -> Self {
        self.preload_size = pages;
        self
    }

    /// Enable or disable the short timeout for page moves.
    pub fn with_prioritize_page_move(mut self, enabled: bool) -> Self {
        self.prioritize_page_move = enabled;
        self
    }

    /// Set the page-move visibility timeout.
    pub fn with_page_move_timeout(mut self, timeout: Duration) -> Self {
        self.page_move_timeout = timeout;
        self
    }

    /// Set the first-view visibility timeout.
    pub fn with_first_view_timeout(mut self, timeout: Duration) -> Self {
        self.first_view_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BookViewConfig::default();
        assert_eq!(config.page_mode, PageMode::Single);
        assert_eq!(config.read_order, ReadOrder::RightToLeft);
        assert!(!config.divide_wide_page);
        assert!(config.insert_dummy_page);
        assert!(config.preload_enabled);
        assert_eq!(config.preload_size, 2);
        assert_eq!(config.wide_page_ratio, 1.0);
        assert!(config.prioritize_page_move);
        assert_eq!(config.page_move_timeout, Duration::from_millis(100));
        assert_eq!(config.first_view_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(PageMode::Single.frame_size(), 1);
        assert_eq!(PageMode::Wide.frame_size(), 2);
        assert_eq!(
            BookViewConfig::default()
                .with_page_mode(PageMode::Wide)
                .frame_size(),
            2
        );
    }

    #[test]
    fn test_builder() {
        let config = BookViewConfig::new()
            .with_page_mode(PageMode::Wide)
            .with_read_order(ReadOrder::LeftToRight)
            .with_divide_wide_page(true)
            .with_solo_first_page(true)
            .with_solo_last_page(true)
            .with_solo_wide_page(true)
            .with_insert_dummy_page(false)
            .with_wide_page_ratio(1.2)
            .with_preload_enabled(false)
            .with_preload_size(4)
            .with_prioritize_page_move(false)
            .with_page_move_timeout(Duration::from_millis(50))
            .with_first_view_timeout(Duration::from_secs(2));

        assert_eq!(config.page_mode, PageMode::Wide);
        assert_eq!(config.read_order, ReadOrder::LeftToRight);
        assert!(config.divide_wide_page);
        assert!(config.solo_first_page);
        assert!(config.solo_last_page);
        assert!(config.solo_wide_page);
        assert!(!config.insert_dummy_page);
        assert_eq!(config.wide_page_ratio, 1.2);
        assert!(!config.preload_enabled);
        assert_eq!(config.preload_size, 4);
        assert!(!config.prioritize_page_move);
        assert_eq!(config.page_move_timeout, Duration::from_millis(50));
        assert_eq!(config.first_view_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_serde_round_trip() {
        let config = BookViewConfig::default()
            .with_page_mode(PageMode::Wide)
            .with_preload_size(3);

        let json = serde_json::to_string(&config).unwrap();
        let restored: BookViewConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.page_mode, PageMode::Wide);
        assert_eq!(restored.preload_size, 3);
        assert_eq!(restored.first_view_timeout, config.first_view_timeout);
    }
}
