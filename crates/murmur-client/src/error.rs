//! Client errors.

use thiserror::Error;

/// Why one event stream connection ended.
///
/// Every variant is transient: the stream client retries with backoff and
/// reports the failure through [`ConnectionStatus::Retrying`] instead of
/// returning it.
///
/// [`ConnectionStatus::Retrying`]: crate::ConnectionStatus::Retrying
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Request could not be sent or the connection dropped during connect
    #[error("transport failed: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("unexpected status {0}")]
    Status(u16),

    /// Response is not an event stream
    #[error("unexpected content type {0:?}")]
    ContentType(Option<String>),

    /// Response has no body to stream
    #[error("response has no body")]
    MissingBody,

    /// Reading the body failed mid-stream
    #[error("stream read failed: {0}")]
    Read(String),

    /// Server closed the stream
    #[error("stream ended")]
    EndOfStream,

    /// Gateway URL cannot carry a path
    #[error("invalid gateway url: {0}")]
    InvalidUrl(String),
}

/// REST collaborator errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// Request could not be sent or the response could not be read
    #[error("request failed: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("server returned status {0}")]
    Status(u16),

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),

    /// API base URL cannot carry a path
    #[error("invalid api url: {0}")]
    InvalidUrl(String),
}
