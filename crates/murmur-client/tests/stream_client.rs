//! Event stream client against a scripted transport and a virtual clock.

use std::{future::Future, time::Duration};

use bytes::Bytes;
use murmur_client::{ConnectionStatus, EventStreamClient, StreamConfig, StreamError, StreamHandler};
use murmur_core::Environment;
use murmur_harness::{Script, ScriptedConnector, SimEnv, SimInstant, frame};
use murmur_proto::{Channel, DEFAULT_MAX_FRAME_BYTES, GatewayEvent, Timestamp};
use tokio::sync::mpsc;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Event(GatewayEvent, Option<Timestamp>),
    Connected,
    Status(ConnectionStatus),
}

struct Recorder(mpsc::UnboundedSender<Seen>);

impl StreamHandler for Recorder {
    fn on_event(&mut self, event: GatewayEvent, ts: Option<Timestamp>) {
        let _ = self.0.send(Seen::Event(event, ts));
    }

    fn on_connected(&mut self) {
        let _ = self.0.send(Seen::Connected);
    }

    fn on_status(&mut self, status: &ConnectionStatus) {
        let _ = self.0.send(Seen::Status(status.clone()));
    }
}

fn recorder() -> (Recorder, mpsc::UnboundedReceiver<Seen>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Recorder(tx), rx)
}

/// Receive until an event arrives, skipping status reports.
async fn next_event(rx: &mut mpsc::UnboundedReceiver<Seen>) -> (GatewayEvent, Option<Timestamp>) {
    loop {
        match rx.recv().await {
            Some(Seen::Event(event, ts)) => return (event, ts),
            Some(_) => {},
            None => panic!("stream task ended"),
        }
    }
}

fn config() -> StreamConfig {
    StreamConfig::new(Url::parse("https://chat.example/").unwrap(), "tok")
}

fn at(ms: i64) -> Timestamp {
    Timestamp::from_millis(ms)
}

fn channel(id: &str) -> GatewayEvent {
    GatewayEvent::ChannelCreated(Channel {
        id: id.into(),
        name: id.into(),
        topic: None,
        private: false,
        last_message_at: None,
        owner_id: "a1".into(),
    })
}

fn has_query(url: &Url, key: &str, value: &str) -> bool {
    url.query_pairs().any(|(k, v)| k == key && v == value)
}

#[tokio::test]
async fn frames_reach_handler_in_order() {
    let connector = ScriptedConnector::new([Script::open([
        frame(channel("c1"), Some(at(10))),
        Bytes::from_static(b"data: {not json}\n\n"),
        frame(GatewayEvent::Heartbeat, Some(at(20))),
        frame(channel("c2"), None),
    ])]);
    let (handler, mut rx) = recorder();
    let handle = EventStreamClient::new(config(), connector, SimEnv::default()).spawn(handler);

    assert_eq!(next_event(&mut rx).await, (channel("c1"), Some(at(10))));
    assert_eq!(next_event(&mut rx).await, (GatewayEvent::Heartbeat, Some(at(20))));
    assert_eq!(next_event(&mut rx).await, (channel("c2"), None));
    assert_eq!(handle.cursor(), Some(at(20)));

    handle.close();
    handle.join().await;
}

#[tokio::test]
async fn frame_split_across_chunks_decodes_once() {
    let bytes = frame(channel("c1"), Some(at(7)));
    let (a, rest) = bytes.split_at(3);
    let (b, c) = rest.split_at(rest.len() - 1);
    let connector = ScriptedConnector::new([Script::open([
        Bytes::copy_from_slice(a),
        Bytes::copy_from_slice(b),
        Bytes::copy_from_slice(c),
        frame(channel("c2"), Some(at(8))),
    ])]);
    let (handler, mut rx) = recorder();
    let handle = EventStreamClient::new(config(), connector, SimEnv::default()).spawn(handler);

    assert_eq!(next_event(&mut rx).await, (channel("c1"), Some(at(7))));
    assert_eq!(next_event(&mut rx).await, (channel("c2"), Some(at(8))));

    handle.close();
    handle.join().await;
}

#[tokio::test]
async fn reconnect_resumes_from_cursor() {
    let connector = ScriptedConnector::new([Script::body([frame(channel("c1"), Some(at(50)))])]);
    let env = SimEnv::default();
    let (handler, _rx) = recorder();
    let handle =
        EventStreamClient::new(config(), connector.clone(), env.clone()).spawn(handler);

    connector.wait_for_attempts(2).await;
    let urls = connector.urls();
    assert_eq!(urls[0].path(), "/gateway");
    assert!(has_query(&urls[0], "token", "tok"));
    assert!(!urls[0].query_pairs().any(|(k, _)| k == "last_event_ts"));
    assert!(has_query(&urls[1], "last_event_ts", "50"));
    assert_eq!(env.sleeps(), vec![Duration::from_millis(500)]);

    handle.close();
    handle.join().await;
}

#[tokio::test]
async fn unterminated_frame_over_cap_forces_reconnect() {
    let mut flood = b"data: ".to_vec();
    flood.resize(DEFAULT_MAX_FRAME_BYTES + 1, b'x');
    let connector = ScriptedConnector::new([
        Script::open([frame(channel("c1"), Some(at(5))), Bytes::from(flood)]),
        Script::open([frame(channel("c2"), Some(at(6)))]),
    ]);
    let env = SimEnv::default();
    let (handler, mut rx) = recorder();
    let handle =
        EventStreamClient::new(config(), connector.clone(), env.clone()).spawn(handler);

    assert_eq!(next_event(&mut rx).await, (channel("c1"), Some(at(5))));
    assert_eq!(next_event(&mut rx).await, (channel("c2"), Some(at(6))));
    assert_eq!(connector.attempts(), 2);
    assert!(has_query(&connector.urls()[1], "last_event_ts", "5"));
    assert_eq!(env.sleeps(), vec![Duration::from_millis(500)]);

    handle.close();
    handle.join().await;
}

#[tokio::test]
async fn configured_cursor_is_used_on_first_connect() {
    let connector = ScriptedConnector::default();
    let (handler, _rx) = recorder();
    let config = config().with_cursor(Some(at(1_234)));
    let handle =
        EventStreamClient::new(config, connector.clone(), SimEnv::default()).spawn(handler);

    connector.wait_for_attempts(1).await;
    assert!(has_query(&connector.urls()[0], "last_event_ts", "1234"));

    handle.close();
    handle.join().await;
}

#[tokio::test]
async fn backoff_grows_and_resets_after_success() {
    let fail = || Script::Fail(StreamError::Status(503));
    let connector = ScriptedConnector::new([
        fail(),
        fail(),
        fail(),
        Script::body(Vec::<Bytes>::new()),
        fail(),
    ]);
    let env = SimEnv::default();
    let (handler, _rx) = recorder();
    let handle =
        EventStreamClient::new(config(), connector.clone(), env.clone()).spawn(handler);

    connector.wait_for_attempts(6).await;
    let ms = |m| Duration::from_millis(m);
    assert_eq!(env.sleeps(), vec![ms(500), ms(750), ms(1_125), ms(500), ms(750)]);

    handle.close();
    handle.join().await;
}

#[tokio::test]
async fn close_during_pending_connect() {
    let connector = ScriptedConnector::default();
    let (handler, mut rx) = recorder();
    let handle =
        EventStreamClient::new(config(), connector.clone(), SimEnv::default()).spawn(handler);

    connector.wait_for_attempts(1).await;
    handle.close();
    assert!(handle.is_closed());
    handle.join().await;

    assert_eq!(connector.attempts(), 1);
    assert_eq!(rx.recv().await, Some(Seen::Status(ConnectionStatus::Connecting)));
    assert_eq!(rx.recv().await, Some(Seen::Status(ConnectionStatus::Closed)));
    assert_eq!(rx.recv().await, None);
}

/// Environment whose sleeps never finish.
#[derive(Clone, Default)]
struct StuckEnv(SimEnv);

impl Environment for StuckEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        self.0.now()
    }

    fn wall_clock(&self) -> Timestamp {
        self.0.wall_clock()
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        std::future::pending()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.0.random_bytes(buffer);
    }
}

#[tokio::test]
async fn close_during_backoff_sleep() {
    let refused = StreamError::Transport("connection refused".into());
    let connector = ScriptedConnector::new([Script::Fail(refused)]);
    let (handler, mut rx) = recorder();
    let handle =
        EventStreamClient::new(config(), connector.clone(), StuckEnv::default()).spawn(handler);

    let retrying = Seen::Status(ConnectionStatus::Retrying {
        attempt: 1,
        delay: Duration::from_millis(500),
    });
    assert_eq!(rx.recv().await, Some(Seen::Status(ConnectionStatus::Connecting)));
    assert_eq!(rx.recv().await, Some(retrying));

    handle.close();
    handle.join().await;

    assert_eq!(connector.attempts(), 1);
    assert_eq!(rx.recv().await, Some(Seen::Status(ConnectionStatus::Closed)));
}

#[tokio::test]
async fn status_sequence_across_a_drop() {
    let connector = ScriptedConnector::new([Script::body([frame(channel("c1"), None)])]);
    let (handler, mut rx) = recorder();
    let handle =
        EventStreamClient::new(config(), connector.clone(), SimEnv::default()).spawn(handler);

    connector.wait_for_attempts(2).await;
    handle.close();
    handle.join().await;

    let mut seen = Vec::new();
    while let Some(entry) = rx.recv().await {
        seen.push(entry);
    }
    assert_eq!(seen, vec![
        Seen::Status(ConnectionStatus::Connecting),
        Seen::Status(ConnectionStatus::Connected),
        Seen::Connected,
        Seen::Event(channel("c1"), None),
        Seen::Status(ConnectionStatus::Retrying { attempt: 1, delay: Duration::from_millis(500) }),
        Seen::Status(ConnectionStatus::Connecting),
        Seen::Status(ConnectionStatus::Closed),
    ]);
}

#[tokio::test]
async fn dropping_the_handle_stops_the_task() {
    let connector = ScriptedConnector::default();
    let (handler, mut rx) = recorder();
    let handle =
        EventStreamClient::new(config(), connector.clone(), SimEnv::default()).spawn(handler);

    connector.wait_for_attempts(1).await;
    drop(handle);

    // The handler is dropped with the task, closing the channel
    while rx.recv().await.is_some() {}
    assert_eq!(connector.attempts(), 1);
}
