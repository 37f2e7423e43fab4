//! Scripted event stream transport.
//!
//! Each call to [`Connector::connect`] consumes the next [`Script`] entry.
//! Once the script runs out, connect attempts hang until the stream client
//! is closed, so a test can inspect state at a quiet point.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use murmur_client::{ByteStream, Connector, StreamError};
use murmur_proto::{GatewayEvent, Timestamp};
use tokio::sync::watch;
use url::Url;

/// Outcome of one scripted connection attempt.
#[derive(Debug, Clone)]
pub enum Script {
    /// The attempt fails before any body is produced.
    Fail(StreamError),
    /// The attempt succeeds; the body yields these chunks, then ends.
    Body(Vec<Result<Bytes, StreamError>>),
    /// The attempt succeeds; the body yields these chunks, then stays open.
    Open(Vec<Bytes>),
}

impl Script {
    /// Body that yields `chunks` and then ends.
    pub fn body<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::Body(chunks.into_iter().map(|c| Ok(c.into())).collect())
    }

    /// Body that yields `chunks` and then stays open.
    pub fn open<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::Open(chunks.into_iter().map(Into::into).collect())
    }
}

/// One SSE frame carrying `event`.
pub fn frame(event: GatewayEvent, ts: Option<Timestamp>) -> Bytes {
    Bytes::from(event.into_envelope(ts).to_sse())
}

#[derive(Default)]
struct ScriptState {
    script: VecDeque<Script>,
    urls: Vec<Url>,
}

/// [`Connector`] that replays a script.
///
/// Clones share one script and one attempt log.
#[derive(Clone)]
pub struct ScriptedConnector {
    state: Arc<Mutex<ScriptState>>,
    attempts: Arc<watch::Sender<usize>>,
}

impl Default for ScriptedConnector {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedConnector {
    /// Connector that plays `script` in order.
    pub fn new(script: impl IntoIterator<Item = Script>) -> Self {
        let state = ScriptState { script: script.into_iter().collect(), urls: Vec::new() };
        let (attempts, _) = watch::channel(0);
        Self { state: Arc::new(Mutex::new(state)), attempts: Arc::new(attempts) }
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry to the script.
    pub fn push(&self, entry: Script) {
        self.state().script.push_back(entry);
    }

    /// URL of every connection attempt so far.
    pub fn urls(&self) -> Vec<Url> {
        self.state().urls.clone()
    }

    /// Number of connection attempts so far.
    pub fn attempts(&self) -> usize {
        *self.attempts.borrow()
    }

    /// Resolves once at least `n` connection attempts were made.
    pub async fn wait_for_attempts(&self, n: usize) {
        let mut rx = self.attempts.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }
}

impl Connector for ScriptedConnector {
    async fn connect(&self, url: Url) -> Result<ByteStream, StreamError> {
        let next = {
            let mut state = self.state();
            state.urls.push(url);
            state.script.pop_front()
        };
        self.attempts.send_modify(|count| *count += 1);

        match next {
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Body(chunks)) => Ok(Box::pin(stream::iter(chunks))),
            Some(Script::Open(chunks)) => {
                let chunks = chunks.into_iter().map(Ok::<_, StreamError>);
                let body = stream::iter(chunks).chain(stream::pending());
                Ok(Box::pin(body))
            },
            None => {
                tracing::trace!("script exhausted, holding connection attempt");
                std::future::pending().await
            },
        }
    }
}
