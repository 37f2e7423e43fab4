//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol decoding.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while decoding a gateway frame.
///
/// Decoding errors are not fatal to a connection: the stream client drops
/// the offending frame and keeps reading. [`ProtocolError::FrameTooLarge`]
/// is the exception and ends the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame data is not a JSON object with a string `t` field.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// A known tag arrived without the `d` payload it requires.
    #[error("missing payload for {tag}")]
    MissingPayload {
        /// Tag of the offending frame
        tag: &'static str,
    },

    /// The `d` payload does not match the shape expected for its tag.
    #[error("invalid payload for {tag}: {reason}")]
    InvalidPayload {
        /// Tag of the offending frame
        tag: &'static str,
        /// Deserializer message
        reason: String,
    },

    /// An unfinished SSE frame buffered more bytes than allowed.
    #[error("unterminated frame of {pending} bytes exceeds {limit}")]
    FrameTooLarge {
        /// Bytes buffered for the frame
        pending: usize,
        /// Configured cap
        limit: usize,
    },
}
