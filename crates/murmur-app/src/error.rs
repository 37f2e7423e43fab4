//! Application layer errors.

use murmur_client::RestError;
use murmur_proto::{ChannelId, MessageId};
use murmur_store::{PersistError, StoreError};
use thiserror::Error;

/// A history page could not be fetched. Retryable: the view keeps its
/// pagination state and asks again on the next near-top scroll.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("page fetch failed: {reason}")]
pub struct FetchError {
    /// What went wrong
    pub reason: String,
}

impl FetchError {
    /// Fetch error with a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<RestError> for FetchError {
    fn from(error: RestError) -> Self {
        Self::new(error.to_string())
    }
}

/// Session operation errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// REST call failed
    #[error(transparent)]
    Rest(#[from] RestError),

    /// Store refused the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Loading or saving persisted state failed
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Operation needs a signed-in user
    #[error("no session user")]
    NotSignedIn,

    /// Channel has no mounted view
    #[error("channel {0} is not open")]
    ChannelNotOpen(ChannelId),

    /// Message is not a failed submission
    #[error("message {0} cannot be retried")]
    NotRetryable(MessageId),
}
