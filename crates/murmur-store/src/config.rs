//! Store configuration.

use std::time::Duration;

/// Maximum messages retained per channel.
pub const DEFAULT_MESSAGE_BOUND: usize = 2000;

/// Time a typing marker lives without being refreshed.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_secs(10);

/// Change notifications buffered per subscriber before it lags.
const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Per-channel message cap; oldest by creation time are evicted beyond it
    pub message_bound: usize,
    /// Typing marker lifetime
    pub typing_timeout: Duration,
    /// Buffered change notifications per subscriber
    pub change_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            message_bound: DEFAULT_MESSAGE_BOUND,
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
            change_capacity: DEFAULT_CHANGE_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Default configuration with a different message cap.
    pub fn with_message_bound(bound: usize) -> Self {
        Self { message_bound: bound.max(1), ..Self::default() }
    }
}
