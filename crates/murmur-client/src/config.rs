//! Stream client configuration.

use std::time::Duration;

use murmur_core::{Backoff, backoff};
use murmur_proto::Timestamp;
use url::Url;

use crate::StreamError;

/// Event stream client configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Gateway base URL. The stream is served at `{gateway}/gateway`.
    pub gateway: Url,
    /// Auth token, sent as the `token` query parameter.
    pub token: String,
    /// Resume cursor for the first connection.
    pub cursor: Option<Timestamp>,
    /// First reconnect delay.
    pub initial_delay: Duration,
    /// Reconnect delay ceiling.
    pub max_delay: Duration,
    /// Growth factor between reconnect delays.
    pub multiplier: f64,
}

impl StreamConfig {
    /// Configuration with the default reconnect schedule.
    pub fn new(gateway: Url, token: impl Into<String>) -> Self {
        Self {
            gateway,
            token: token.into(),
            cursor: None,
            initial_delay: backoff::INITIAL_DELAY,
            max_delay: backoff::MAX_DELAY,
            multiplier: backoff::MULTIPLIER,
        }
    }

    /// Resume from `cursor` on the first connection.
    #[must_use]
    pub fn with_cursor(mut self, cursor: Option<Timestamp>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Fresh reconnect schedule.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay, self.max_delay, self.multiplier)
    }

    /// Stream URL: `{gateway}/gateway?token=...&last_event_ts=...`.
    pub fn stream_url(&self, cursor: Option<Timestamp>) -> Result<Url, StreamError> {
        let mut url = self.gateway.clone();
        url.path_segments_mut()
            .map_err(|()| StreamError::InvalidUrl(self.gateway.to_string()))?
            .pop_if_empty()
            .push("gateway");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("token", &self.token);
            if let Some(cursor) = cursor {
                query.append_pair("last_event_ts", &cursor.to_string());
            }
        }
        Ok(url)
    }
}
