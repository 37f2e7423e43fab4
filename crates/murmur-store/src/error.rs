//! Store and persistence errors.

use std::io;

use murmur_proto::ChannelId;
use thiserror::Error;

/// Errors from store operations that can refuse input.
///
/// Ordinary mutations are total and never return these; only optimistic
/// insertion validates its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An optimistic record with this nonce already exists in the channel.
    #[error("nonce {nonce} already pending in channel {channel}")]
    DuplicateNonce {
        /// Channel of the rejected record
        channel: ChannelId,
        /// Conflicting nonce
        nonce: String,
    },
}

/// Errors from the persistence collaborator.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Reading or writing the backing file failed
    #[error("persistence I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Stored state could not be encoded or decoded
    #[error("persisted state is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}
