//! Event delivery callbacks.

use std::time::Duration;

use murmur_proto::{GatewayEvent, Timestamp};

/// Connection state of an event stream, reported to the handler on every
/// change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Opening a connection.
    Connecting,
    /// Connected and streaming.
    Connected,
    /// Last attempt failed; the next one starts after `delay`.
    Retrying {
        /// Consecutive failed attempts so far
        attempt: u32,
        /// Wait before the next attempt
        delay: Duration,
    },
    /// Closed by the owner. Terminal.
    Closed,
}

/// Receives decoded events from an event stream client.
///
/// Called from the client's task, one call at a time.
pub trait StreamHandler: Send + 'static {
    /// A decoded event, with the server event time if the frame carried one.
    fn on_event(&mut self, event: GatewayEvent, ts: Option<Timestamp>);

    /// A connection (or reconnection) succeeded.
    fn on_connected(&mut self) {}

    /// The connection status changed.
    fn on_status(&mut self, _status: &ConnectionStatus) {}
}

impl<F> StreamHandler for F
where
    F: FnMut(GatewayEvent, Option<Timestamp>) + Send + 'static,
{
    fn on_event(&mut self, event: GatewayEvent, ts: Option<Timestamp>) {
        self(event, ts);
    }
}
