//! View configuration.

/// Messages requested per history page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Paginated view tuning. All distances are in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewConfig {
    /// Messages requested per page. A shorter page means history is
    /// exhausted.
    pub page_size: usize,
    /// Scrolling within this distance of the top requests older history.
    pub top_threshold: f64,
    /// Within this distance of the bottom the view counts as pinned.
    pub bottom_threshold: f64,
    /// Height assumed for items the host has not measured yet.
    pub estimated_item_height: f64,
    /// Extra items rendered beyond each edge of the viewport.
    pub overscan: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            top_threshold: 300.0,
            bottom_threshold: 32.0,
            estimated_item_height: 48.0,
            overscan: 6,
        }
    }
}
