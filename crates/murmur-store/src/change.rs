//! Store change notifications.

use murmur_proto::ChannelId;

/// What a mutation touched.
///
/// Published after the mutation has fully completed, so a reader reacting
/// to a change always sees consistent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Channel list or a channel record changed.
    Channels,
    /// An author record changed.
    Authors,
    /// The session user's own profile changed.
    SessionUser,
    /// Messages in a channel changed.
    Messages {
        /// Affected channel
        channel: ChannelId,
    },
    /// Typing markers in a channel changed.
    Typing {
        /// Affected channel
        channel: ChannelId,
    },
    /// Resume cursor or read markers advanced.
    Cursor,
}
