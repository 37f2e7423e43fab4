//! Inputs to a paginated view.

use murmur_proto::{ChannelId, MessageId, Timestamp};
use murmur_store::SyncStore;

/// Something the host observed.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Scroll position changed, by the user or by an executed
    /// [`ViewAction::ScrollTo`](crate::ViewAction::ScrollTo).
    Scrolled {
        /// Distance from the content top to the viewport top
        scroll_top: f64,
    },

    /// Viewport height changed.
    Resized {
        /// New viewport height
        viewport: f64,
    },

    /// An item was laid out.
    Measured {
        /// Measured item
        id: MessageId,
        /// Rendered height
        height: f64,
    },

    /// The channel's records changed in the store.
    ItemsChanged {
        /// Message ids in display order
        ids: Vec<MessageId>,
        /// Creation time of the oldest loaded message
        oldest: Option<Timestamp>,
    },

    /// The host painted a frame.
    FramePainted,
}

impl ViewEvent {
    /// Snapshot of a channel's display order.
    pub fn items_from(store: &SyncStore, channel: &ChannelId) -> Self {
        Self::ItemsChanged {
            ids: store.ordered_ids(channel).to_vec(),
            oldest: store.oldest_created_at(channel),
        }
    }
}
