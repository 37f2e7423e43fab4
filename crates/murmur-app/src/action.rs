//! Outputs of a paginated view.

use murmur_proto::{ChannelId, Timestamp};

/// Request for the page of history before a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Channel to page
    pub channel: ChannelId,
    /// Only messages created strictly before this time
    pub before: Timestamp,
    /// Page size
    pub limit: usize,
}

/// Something the host must do.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    /// Move the viewport so its top sits at `scroll_top`.
    ScrollTo {
        /// Target distance from the content top
        scroll_top: f64,
    },

    /// Fetch older history, then hand the result to
    /// [`PaginatedView::complete_fetch`](crate::PaginatedView::complete_fetch).
    FetchOlder(FetchRequest),

    /// Visible window or view state changed; redraw.
    Render,
}
