//! Stream events into the store.
//!
//! [`apply_event`] is the single place where gateway events become store
//! mutations. [`StoreSink`] plugs it into an event stream client.

use murmur_client::{ConnectionStatus, StreamHandler};
use murmur_core::Environment;
use murmur_proto::{GatewayEvent, Timestamp};
use murmur_store::{SharedStore, SyncStore, lock};
use tokio::sync::watch;

/// Apply one gateway event to the store.
///
/// `ts` is the server event time; every event carrying one advances the
/// resume cursor, heartbeats included. `now` is the local receive time,
/// used for cache stamps and typing deadlines.
pub fn apply_event(
    store: &mut SyncStore,
    event: GatewayEvent,
    ts: Option<Timestamp>,
    now: Timestamp,
) {
    match event {
        GatewayEvent::ChannelCreated(channel) => store.upsert_channel(channel),
        GatewayEvent::ChannelUpdated(patch) => store.patch_channel(&patch),
        GatewayEvent::ChannelDeleted(channel) => store.remove_channel(&channel.id),
        GatewayEvent::MessageCreated(message) => {
            let channel = message.channel_id.clone();
            let author = message.author_id.clone();
            store.reconcile_by_nonce(&channel, message, now);
            store.stop_typing(&channel, &author);
        },
        GatewayEvent::MessageUpdated(patch) => store.patch_message(&patch),
        GatewayEvent::MessageDeleted(message) => {
            store.remove_message(&message.channel_id, &message.id);
        },
        GatewayEvent::AuthorUpdated(patch) => store.patch_author(&patch),
        GatewayEvent::TypingStarted(typing) => {
            let own = store.session_user().is_some_and(|user| user.id == typing.author_id);
            if own {
                tracing::trace!(channel = %typing.channel_id, "ignoring own typing");
            } else {
                store.start_typing(&typing.channel_id, &typing.author_id, now);
            }
        },
        GatewayEvent::Heartbeat => {},
    }

    if let Some(ts) = ts {
        store.advance_cursor(ts);
    }
}

/// [`StreamHandler`] that applies events to a shared store.
///
/// Also expires typing markers on every event and publishes the stream's
/// connection status for the UI.
pub struct StoreSink<E> {
    store: SharedStore,
    env: E,
    status: watch::Sender<ConnectionStatus>,
}

impl<E: Environment> StoreSink<E> {
    /// Sink writing into `store`.
    pub fn new(store: SharedStore, env: E) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Connecting);
        Self { store, env, status }
    }

    /// Follow the connection status.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }
}

impl<E: Environment> StreamHandler for StoreSink<E> {
    fn on_event(&mut self, event: GatewayEvent, ts: Option<Timestamp>) {
        let now = self.env.wall_clock();
        let mut store = lock(&self.store);
        apply_event(&mut store, event, ts, now);
        store.tick(now);
    }

    fn on_connected(&mut self) {
        tracing::info!(cursor = ?lock(&self.store).cursor(), "stream connected");
    }

    fn on_status(&mut self, status: &ConnectionStatus) {
        self.status.send_replace(status.clone());
    }
}

#[cfg(test)]
mod tests {
    use murmur_proto::{
        Author, AuthorId, AuthorPatch, Channel, ChannelPatch, ChannelRef, Message, MessageId,
        MessageRef, PresenceStatus, TypingStarted,
    };
    use murmur_store::{ClientMessage, SessionUser, UploadState};

    use super::*;

    fn at(ms: i64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn channel(id: &str) -> Channel {
        Channel {
            id: id.into(),
            name: id.into(),
            topic: None,
            private: false,
            last_message_at: None,
            owner_id: "a1".into(),
        }
    }

    fn typing(author: &str) -> GatewayEvent {
        GatewayEvent::TypingStarted(TypingStarted {
            channel_id: "c1".into(),
            author_id: author.into(),
        })
    }

    #[test]
    fn channel_lifecycle() {
        let mut store = SyncStore::default();
        apply_event(&mut store, GatewayEvent::ChannelCreated(channel("c1")), None, at(0));
        let patch =
            ChannelPatch { id: "c1".into(), name: Some("general".into()), ..Default::default() };
        apply_event(&mut store, GatewayEvent::ChannelUpdated(patch), None, at(1));
        assert_eq!(store.channel(&"c1".into()).map(|c| c.name.as_str()), Some("general"));

        let deleted = GatewayEvent::ChannelDeleted(ChannelRef { id: "c1".into() });
        apply_event(&mut store, deleted, None, at(2));
        assert!(store.channel(&"c1".into()).is_none());
    }

    #[test]
    fn created_message_reconciles_and_clears_typing() {
        let mut store = SyncStore::default();
        let c1 = "c1".into();
        let local = Message::new("local-abc", "c1", "me", "hi", at(5)).with_nonce("abc");
        let record = ClientMessage::optimistic(local, vec![UploadState::pending(None)]);
        store.insert_optimistic(&c1, record, at(5)).unwrap();
        store.start_typing(&c1, &"me".into(), at(5));

        let confirmed = Message::new("m3", "c1", "me", "hi", at(20)).with_nonce("abc");
        apply_event(&mut store, GatewayEvent::MessageCreated(confirmed), Some(at(20)), at(21));

        assert_eq!(store.ordered_ids(&c1), [MessageId::new("m3")]);
        assert_eq!(store.message(&c1, &"m3".into()).unwrap().uploads.len(), 1);
        assert!(store.typing(&c1).is_empty());
        assert_eq!(store.cursor(), Some(at(20)));
    }

    #[test]
    fn deleted_message_is_removed() {
        let mut store = SyncStore::default();
        let c1 = "c1".into();
        let record = ClientMessage::canonical(Message::new("m1", "c1", "a1", "x", at(1)));
        store.upsert(&c1, record, at(1));

        let deleted = MessageRef { id: "m1".into(), channel_id: "c1".into() };
        apply_event(&mut store, GatewayEvent::MessageDeleted(deleted), None, at(2));
        assert_eq!(store.message_count(&c1), 0);
    }

    #[test]
    fn author_update_reaches_session_user() {
        let mut store = SyncStore::default();
        store.set_session_user(SessionUser::from_author(&Author::new("me", "me")));

        let patch = AuthorPatch {
            id: "me".into(),
            status: Some(PresenceStatus::Idle),
            ..Default::default()
        };
        apply_event(&mut store, GatewayEvent::AuthorUpdated(patch), None, at(0));
        assert_eq!(store.session_user().map(|u| u.status), Some(PresenceStatus::Idle));
    }

    #[test]
    fn own_typing_is_ignored() {
        let mut store = SyncStore::default();
        store.set_session_user(SessionUser::from_author(&Author::new("me", "me")));

        apply_event(&mut store, typing("me"), None, at(0));
        apply_event(&mut store, typing("a2"), None, at(0));
        assert_eq!(store.typing(&"c1".into()), vec![AuthorId::new("a2")]);
    }

    #[test]
    fn heartbeat_only_moves_cursor() {
        let mut store = SyncStore::default();
        apply_event(&mut store, GatewayEvent::Heartbeat, Some(at(40)), at(0));
        apply_event(&mut store, GatewayEvent::Heartbeat, Some(at(30)), at(0));
        assert_eq!(store.cursor(), Some(at(40)));
    }
}
