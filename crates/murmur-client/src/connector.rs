//! Stream transport.
//!
//! The stream client only needs "open this URL and give me the body bytes".
//! [`Connector`] is that seam: [`HttpConnector`] does it over HTTP, tests
//! substitute a scripted connector.

use std::{future::Future, pin::Pin};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::StreamError;

/// Body of an open event stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Media type of a server event stream.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Opens event stream connections.
pub trait Connector: Send + Sync + 'static {
    /// Open `url` and return the response body once the response has been
    /// validated as an event stream.
    fn connect(&self, url: Url) -> impl Future<Output = Result<ByteStream, StreamError>> + Send;
}

/// Validate the head of a stream response.
///
/// A response is a usable event stream only if its status is a success, its
/// content type names `text/event-stream`, and it does not declare an empty
/// body.
pub fn check_response(
    status: u16,
    content_type: Option<&str>,
    content_length: Option<u64>,
) -> Result<(), StreamError> {
    if !(200..300).contains(&status) {
        return Err(StreamError::Status(status));
    }
    if !content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains(EVENT_STREAM)) {
        return Err(StreamError::ContentType(content_type.map(str::to_owned)));
    }
    if content_length == Some(0) {
        return Err(StreamError::MissingBody);
    }
    Ok(())
}

/// HTTP connector built on `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    /// Connector with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for HttpConnector {
    async fn connect(&self, url: Url) -> Result<ByteStream, StreamError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, EVENT_STREAM)
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let content_type =
            response.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
        check_response(response.status().as_u16(), content_type, response.content_length())?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::Read(e.to_string())));
        Ok(Box::pin(body))
    }
}
