//! Event stream client.
//!
//! [`EventStreamClient::spawn`] starts one task that owns the connection
//! loop:
//!
//! ```text
//! Connecting ──ok──> Connected ──(error | end)──> Retrying ──sleep──> Connecting
//!      │                                               ▲
//!      └────────────────────error──────────────────────┘
//! ```
//!
//! At most one connection is open at a time and attempts are strictly
//! serialized. The loop runs until [`StreamHandle::close`] is called (or the
//! handle is dropped), which interrupts a pending connect, read or backoff
//! sleep.
//!
//! Each frame that carries `ts` advances the resume cursor, and every
//! reconnect asks the server to resume from it.

use futures_util::StreamExt;
use murmur_core::{Backoff, Environment};
use murmur_proto::{Envelope, GatewayEvent, SseDecoder, Timestamp};
use tokio::{sync::watch, task::JoinHandle};
use url::Url;

use crate::{ConnectionStatus, Connector, StreamConfig, StreamError, StreamHandler};

/// Event stream client, ready to be spawned.
pub struct EventStreamClient<C, E> {
    config: StreamConfig,
    connector: C,
    env: E,
}

impl<C, E> EventStreamClient<C, E>
where
    C: Connector,
    E: Environment,
{
    /// Create a client. Nothing connects until [`spawn`](Self::spawn).
    pub fn new(config: StreamConfig, connector: C, env: E) -> Self {
        Self { config, connector, env }
    }

    /// Start the connection loop on the current tokio runtime.
    pub fn spawn<H: StreamHandler>(self, handler: H) -> StreamHandle {
        let (closed_tx, closed_rx) = watch::channel(false);
        let (cursor_tx, cursor_rx) = watch::channel(self.config.cursor);

        let driver = Driver {
            backoff: self.config.backoff(),
            config: self.config,
            connector: self.connector,
            env: self.env,
            decoder: SseDecoder::new(),
            cursor: cursor_tx,
            handler,
        };
        let task = tokio::spawn(driver.run(closed_rx));

        StreamHandle { closed: closed_tx, cursor: cursor_rx, task }
    }
}

/// Owner's handle to a running event stream.
///
/// Dropping the handle closes the stream.
#[derive(Debug)]
pub struct StreamHandle {
    closed: watch::Sender<bool>,
    cursor: watch::Receiver<Option<Timestamp>>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Stop the stream: abort any in-flight connection and suppress further
    /// retries. Idempotent.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Latest resume cursor.
    pub fn cursor(&self) -> Option<Timestamp> {
        *self.cursor.borrow()
    }

    /// Wait for the stream task to exit. Call [`close`](Self::close) first,
    /// otherwise this waits forever.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "event stream task failed");
        }
    }
}

/// State owned by the stream task.
struct Driver<C, E, H> {
    config: StreamConfig,
    connector: C,
    env: E,
    backoff: Backoff,
    decoder: SseDecoder,
    cursor: watch::Sender<Option<Timestamp>>,
    handler: H,
}

impl<C, E, H> Driver<C, E, H>
where
    C: Connector,
    E: Environment,
    H: StreamHandler,
{
    async fn run(mut self, mut closed: watch::Receiver<bool>) {
        loop {
            if *closed.borrow() {
                break;
            }

            self.set_status(ConnectionStatus::Connecting);
            let error = tokio::select! {
                biased;
                () = wait_closed(&mut closed) => break,
                error = self.connection() => error,
            };

            let delay = self.backoff.next_delay();
            let attempt = self.backoff.failures();
            let delay_ms = delay.as_millis() as u64;
            tracing::warn!(%error, attempt, delay_ms, "event stream disconnected");
            self.set_status(ConnectionStatus::Retrying { attempt, delay });

            tokio::select! {
                biased;
                () = wait_closed(&mut closed) => break,
                () = self.env.sleep(delay) => {},
            }
        }

        tracing::info!("event stream closed");
        self.set_status(ConnectionStatus::Closed);
    }

    /// One connection, from connect to failure. Always ends in an error;
    /// a clean end of body is [`StreamError::EndOfStream`].
    async fn connection(&mut self) -> StreamError {
        match self.stream_frames().await {
            Ok(()) => StreamError::EndOfStream,
            Err(e) => e,
        }
    }

    async fn stream_frames(&mut self) -> Result<(), StreamError> {
        let url = self.config.stream_url(*self.cursor.borrow())?;
        tracing::debug!(gateway = %redacted(&url), "connecting event stream");

        let mut body = self.connector.connect(url).await?;

        self.backoff.reset();
        self.decoder.reset();
        tracing::info!("event stream connected");
        self.set_status(ConnectionStatus::Connected);
        self.handler.on_connected();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            let frames =
                self.decoder.feed(&chunk).map_err(|e| StreamError::Read(e.to_string()))?;
            for frame in frames {
                self.dispatch(&frame);
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: &str) {
        let envelope = match Envelope::parse(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                return;
            },
        };

        let ts = envelope.ts;
        if let Some(ts) = ts {
            self.advance_cursor(ts);
        }

        let tag = envelope.t.clone();
        match envelope.into_event() {
            Ok(Some(GatewayEvent::Heartbeat)) => {
                tracing::trace!("heartbeat");
                self.handler.on_event(GatewayEvent::Heartbeat, ts);
            },
            Ok(Some(event)) => self.handler.on_event(event, ts),
            Ok(None) => tracing::debug!(%tag, "ignoring unknown event"),
            Err(e) => tracing::warn!(%tag, error = %e, "dropping event with malformed payload"),
        }
    }

    fn advance_cursor(&self, ts: Timestamp) {
        self.cursor.send_if_modified(|cursor| {
            if cursor.is_none_or(|current| ts > current) {
                *cursor = Some(ts);
                true
            } else {
                false
            }
        });
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.handler.on_status(&status);
    }
}

/// Resolves once the stream is closed or its handle dropped.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

/// URL without the token, for logs.
fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}
