//! The sync store.
//!
//! [`SyncStore`] holds canonical client state and applies every mutation
//! synchronously through `&mut self`. Consumers on other tasks share one
//! store behind a mutex ([`SharedStore`]), so a reader either sees a
//! mutation completely or not at all. Change notifications go out only after
//! derived state (the ordered message index) has been rebuilt.
//!
//! All mutations are total: unknown channels, authors or messages are
//! treated as empty, logged at `debug`, and otherwise ignored.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use murmur_proto::{
    Author, AuthorId, AuthorPatch, Channel, ChannelId, ChannelPatch, Message, MessageId,
    MessagePatch, Timestamp,
};
use tokio::sync::broadcast;

use crate::{
    ClientMessage, DeliveryStatus, PersistedState, SessionUser, StoreChange, StoreConfig,
    StoreError, messages::ChannelMessages, typing::TypingTracker,
};

/// A store shared between the stream handler, views and REST completions.
pub type SharedStore = Arc<Mutex<SyncStore>>;

/// Lock a shared store.
///
/// Mutations never leave the store half-applied, so a poisoned lock still
/// guards consistent state and is recovered rather than propagated.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, SyncStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Canonical client-side state.
#[derive(Debug)]
pub struct SyncStore {
    config: StoreConfig,
    channels: HashMap<ChannelId, Channel>,
    authors: HashMap<AuthorId, Author>,
    messages: HashMap<ChannelId, ChannelMessages>,
    typing: TypingTracker,
    session: Option<SessionUser>,
    /// Resume cursor of the event stream.
    cursor: Option<Timestamp>,
    /// Read markers.
    last_seen: HashMap<ChannelId, Timestamp>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for SyncStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl SyncStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let (changes, _) = broadcast::channel(config.change_capacity.max(1));
        let typing = TypingTracker::new(config.typing_timeout);
        Self {
            config,
            channels: HashMap::new(),
            authors: HashMap::new(),
            messages: HashMap::new(),
            typing,
            session: None,
            cursor: None,
            last_seen: HashMap::new(),
            changes,
        }
    }

    /// Wrap this store for sharing across tasks.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Subscribe to change notifications.
    ///
    /// A subscriber that falls more than `change_capacity` notifications
    /// behind receives `Lagged` and should re-read whatever it displays.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn publish(&self, change: StoreChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    // Channels

    /// Insert or replace a channel.
    pub fn upsert_channel(&mut self, channel: Channel) {
        match self.channels.get_mut(&channel.id) {
            Some(existing) => {
                let last = existing.last_message_at.max(channel.last_message_at);
                *existing = channel;
                existing.last_message_at = last;
            },
            None => {
                self.channels.insert(channel.id.clone(), channel);
            },
        }
        self.publish(StoreChange::Channels);
    }

    /// Merge a partial update into a known channel.
    pub fn patch_channel(&mut self, patch: &ChannelPatch) {
        let Some(channel) = self.channels.get_mut(&patch.id) else {
            tracing::debug!(channel = %patch.id, "patch for unknown channel ignored");
            return;
        };
        channel.apply(patch);
        self.publish(StoreChange::Channels);
    }

    /// Remove a channel together with its messages, typing markers and read
    /// marker.
    pub fn remove_channel(&mut self, id: &ChannelId) {
        let had_channel = self.channels.remove(id).is_some();
        let had_messages = self.messages.remove(id).is_some();
        self.typing.clear_channel(id);
        self.last_seen.remove(id);

        if had_channel {
            self.publish(StoreChange::Channels);
        }
        if had_messages {
            self.publish(StoreChange::Messages { channel: id.clone() });
        }
        self.publish(StoreChange::Typing { channel: id.clone() });
    }

    /// Replace the channel list with a full server listing.
    ///
    /// Channels missing from the listing are removed along with their
    /// messages.
    pub fn replace_channels(&mut self, channels: Vec<Channel>) {
        let keep: Vec<ChannelId> = channels.iter().map(|c| c.id.clone()).collect();
        let stale: Vec<ChannelId> =
            self.channels.keys().filter(|id| !keep.contains(id)).cloned().collect();
        for id in &stale {
            self.remove_channel(id);
        }
        for channel in channels {
            self.upsert_channel(channel);
        }
    }

    /// Channel by id.
    pub fn channel(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    /// All channels, most recently active first, then by name.
    pub fn channels(&self) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self.channels.values().collect();
        channels.sort_by(|a, b| {
            b.last_message_at.cmp(&a.last_message_at).then_with(|| a.name.cmp(&b.name))
        });
        channels
    }

    // Authors and session

    /// Insert or replace an author. Mirrors into the session profile when
    /// the id is the session user's.
    pub fn upsert_author(&mut self, author: Author) {
        self.merge_into_session(&author);
        self.authors.insert(author.id.clone(), author);
        self.publish(StoreChange::Authors);
    }

    /// Merge a partial author update.
    ///
    /// Unknown authors are created from the patch when it carries a username;
    /// otherwise the author cache is left alone. A patch for the session
    /// user's id reaches the session profile either way.
    pub fn patch_author(&mut self, patch: &AuthorPatch) {
        let cached = match self.authors.get_mut(&patch.id) {
            Some(author) => {
                author.apply(patch);
                true
            },
            None => match &patch.username {
                Some(username) => {
                    let mut author = Author::new(patch.id.clone(), username.clone());
                    author.apply(patch);
                    self.authors.insert(author.id.clone(), author);
                    true
                },
                None => {
                    tracing::debug!(author = %patch.id, "patch for unknown author not cached");
                    false
                },
            },
        };

        if self.session.as_mut().is_some_and(|session| session.merge_patch(patch)) {
            self.publish(StoreChange::SessionUser);
        }
        if cached {
            self.publish(StoreChange::Authors);
        }
    }

    fn merge_into_session(&mut self, author: &Author) {
        let changed = self.session.as_mut().is_some_and(|session| session.merge_author(author));
        if changed {
            self.publish(StoreChange::SessionUser);
        }
    }

    /// Author by id.
    pub fn author(&self, id: &AuthorId) -> Option<&Author> {
        self.authors.get(id)
    }

    /// Set the signed-in user's profile.
    pub fn set_session_user(&mut self, user: SessionUser) {
        self.session = Some(user);
        self.publish(StoreChange::SessionUser);
    }

    /// Signed-in user's profile.
    pub fn session_user(&self) -> Option<&SessionUser> {
        self.session.as_ref()
    }

    // Messages

    /// Merge a record into the channel, then evict down to the bound.
    ///
    /// The existing insertion stamp is kept; a new record is stamped `now`.
    /// Applying the same record twice leaves the store unchanged.
    pub fn upsert(&mut self, channel: &ChannelId, candidate: ClientMessage, now: Timestamp) {
        let created_at = candidate.created_at();
        let canonical = !candidate.is_optimistic();
        let bound = self.config.message_bound;

        let evicted =
            self.messages.entry(channel.clone()).or_default().upsert(candidate, now, bound);
        if !evicted.is_empty() {
            tracing::debug!(channel = %channel, count = evicted.len(), "channel over capacity");
        }

        if canonical {
            if let Some(c) = self.channels.get_mut(channel) {
                c.bump_last_message(created_at);
            }
        }
        self.publish(StoreChange::Messages { channel: channel.clone() });
    }

    /// Store a server-confirmed message, collapsing any optimistic record
    /// that carries the same nonce.
    ///
    /// Upload progress and local previews of the optimistic record move to
    /// the canonical one, so in-flight media keeps its preview until the
    /// remote asset loads.
    pub fn reconcile_by_nonce(&mut self, channel: &ChannelId, message: Message, now: Timestamp) {
        let mut candidate = ClientMessage::canonical(message);

        // The canonical record may already be stored from a page merge, so
        // every other holder of the nonce goes, not just the first found
        let pending = match (candidate.nonce(), self.messages.get(channel)) {
            (Some(nonce), Some(msgs)) => msgs.find_by_nonce_except(nonce, candidate.id()),
            _ => Vec::new(),
        };

        for pending_id in pending {
            let optimistic =
                self.messages.get_mut(channel).and_then(|msgs| msgs.remove(&pending_id));
            if let Some(optimistic) = optimistic {
                tracing::debug!(
                    channel = %channel,
                    local = %pending_id,
                    server = %candidate.id(),
                    "optimistic message confirmed"
                );
                if !optimistic.uploads.is_empty() {
                    candidate.uploads = optimistic.uploads;
                }
            }
        }

        candidate.status = DeliveryStatus::Sent;
        candidate.error = None;
        self.upsert(channel, candidate, now);
    }

    /// Insert a locally submitted placeholder with status `Sending`.
    ///
    /// Rejects a nonce that is already present in the channel; two pending
    /// records sharing a nonce could never both be reconciled.
    pub fn insert_optimistic(
        &mut self,
        channel: &ChannelId,
        record: ClientMessage,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        if let Some(nonce) = record.nonce() {
            let taken = self
                .messages
                .get(channel)
                .is_some_and(|msgs| !msgs.find_by_nonce_except(nonce, record.id()).is_empty());
            if taken {
                return Err(StoreError::DuplicateNonce {
                    channel: channel.clone(),
                    nonce: nonce.to_owned(),
                });
            }
        }
        let record = ClientMessage { status: DeliveryStatus::Sending, error: None, ..record };
        self.upsert(channel, record, now);
        Ok(())
    }

    /// Mark a pending record as failed with an error text.
    pub fn mark_failed(&mut self, channel: &ChannelId, id: &MessageId, error: impl Into<String>) {
        let error = error.into();
        let updated = self.update_message(channel, id, |record| {
            record.status = DeliveryStatus::Failed;
            record.error = Some(error);
        });
        if updated.is_none() {
            tracing::debug!(channel = %channel, message = %id, "mark_failed on unknown message");
        }
    }

    /// Flip a failed record back to `Sending` for a retry.
    ///
    /// Returns the record if it was failed.
    pub fn mark_retrying(&mut self, channel: &ChannelId, id: &MessageId) -> Option<ClientMessage> {
        self.update_message(channel, id, |record| {
            if record.status != DeliveryStatus::Failed {
                return None;
            }
            record.status = DeliveryStatus::Sending;
            record.error = None;
            Some(record.clone())
        })
        .flatten()
    }

    /// Record upload progress of one attached file (clamped to `0..=1`).
    pub fn set_upload_progress(
        &mut self,
        channel: &ChannelId,
        id: &MessageId,
        file_index: usize,
        progress: f32,
    ) {
        let applied = self.update_message(channel, id, |record| {
            record.uploads.get_mut(file_index).map(|upload| upload.set_progress(progress))
        });
        if applied.flatten().is_none() {
            tracing::debug!(channel = %channel, message = %id, file_index, "no such upload");
        }
    }

    /// Merge an edit into a stored message. Unknown messages are ignored.
    pub fn patch_message(&mut self, patch: &MessagePatch) {
        let updated =
            self.update_message(&patch.channel_id, &patch.id, |record| record.message.apply(patch));
        if updated.is_none() {
            tracing::debug!(
                channel = %patch.channel_id,
                message = %patch.id,
                "patch for unknown message ignored"
            );
        }
    }

    /// Remove a message.
    pub fn remove_message(&mut self, channel: &ChannelId, id: &MessageId) {
        let removed = self.messages.get_mut(channel).and_then(|msgs| msgs.remove(id));
        if removed.is_some() {
            self.publish(StoreChange::Messages { channel: channel.clone() });
        }
    }

    fn update_message<R>(
        &mut self,
        channel: &ChannelId,
        id: &MessageId,
        f: impl FnOnce(&mut ClientMessage) -> R,
    ) -> Option<R> {
        let result = self.messages.get_mut(channel)?.update(id, f)?;
        self.publish(StoreChange::Messages { channel: channel.clone() });
        Some(result)
    }

    /// Message by id.
    pub fn message(&self, channel: &ChannelId, id: &MessageId) -> Option<&ClientMessage> {
        self.messages.get(channel).and_then(|msgs| msgs.get(id))
    }

    /// Messages of a channel in creation order.
    pub fn messages(&self, channel: &ChannelId) -> Vec<&ClientMessage> {
        self.messages.get(channel).map(|msgs| msgs.iter().collect()).unwrap_or_default()
    }

    /// Message ids of a channel in creation order.
    pub fn ordered_ids(&self, channel: &ChannelId) -> &[MessageId] {
        match self.messages.get(channel) {
            Some(msgs) => msgs.ordered_ids(),
            None => &[],
        }
    }

    /// Number of stored messages in a channel.
    pub fn message_count(&self, channel: &ChannelId) -> usize {
        self.messages.get(channel).map_or(0, ChannelMessages::len)
    }

    /// Creation time of the oldest stored message.
    pub fn oldest_created_at(&self, channel: &ChannelId) -> Option<Timestamp> {
        self.messages.get(channel).and_then(ChannelMessages::oldest).map(ClientMessage::created_at)
    }

    /// Creation time of the newest stored message.
    pub fn newest_created_at(&self, channel: &ChannelId) -> Option<Timestamp> {
        self.messages.get(channel).and_then(ChannelMessages::newest).map(ClientMessage::created_at)
    }

    // Typing

    /// Start or refresh the typing marker of `author` in `channel`.
    ///
    /// Any live marker for the pair is cancelled first; the new one expires
    /// `typing_timeout` after `now`.
    pub fn start_typing(&mut self, channel: &ChannelId, author: &AuthorId, now: Timestamp) {
        self.typing.start(channel.clone(), author.clone(), now);
        self.publish(StoreChange::Typing { channel: channel.clone() });
    }

    /// Drop the typing marker of `author` in `channel` immediately.
    pub fn stop_typing(&mut self, channel: &ChannelId, author: &AuthorId) {
        if self.typing.stop(channel, author) {
            self.publish(StoreChange::Typing { channel: channel.clone() });
        }
    }

    /// Expire typing markers whose deadline is at or before `now`.
    pub fn tick(&mut self, now: Timestamp) {
        let mut channels: Vec<ChannelId> =
            self.typing.expire(now).into_iter().map(|(channel, _)| channel).collect();
        channels.sort();
        channels.dedup();
        for channel in channels {
            self.publish(StoreChange::Typing { channel });
        }
    }

    /// Authors currently typing in a channel, sorted.
    pub fn typing(&self, channel: &ChannelId) -> Vec<AuthorId> {
        self.typing.typing(channel)
    }

    /// Expiry of a live typing marker.
    pub fn typing_deadline(&self, channel: &ChannelId, author: &AuthorId) -> Option<Timestamp> {
        self.typing.deadline(channel, author)
    }

    /// Earliest typing expiry; the host should `tick` no later than this.
    pub fn next_typing_deadline(&self) -> Option<Timestamp> {
        self.typing.next_deadline()
    }

    /// Number of live typing markers across all channels.
    pub fn typing_marker_count(&self) -> usize {
        self.typing.live_count()
    }

    // Cursor and read markers

    /// Advance the resume cursor. Older values are ignored.
    pub fn advance_cursor(&mut self, ts: Timestamp) {
        if self.cursor.is_none_or(|current| ts > current) {
            self.cursor = Some(ts);
            self.publish(StoreChange::Cursor);
        }
    }

    /// Resume cursor.
    pub fn cursor(&self) -> Option<Timestamp> {
        self.cursor
    }

    /// Record that the user has seen `channel` up to `ts`. Never moves back.
    pub fn mark_seen(&mut self, channel: &ChannelId, ts: Timestamp) {
        let seen = self.last_seen.entry(channel.clone()).or_insert(ts);
        if ts > *seen {
            *seen = ts;
        }
        self.publish(StoreChange::Cursor);
    }

    /// Read marker of a channel.
    pub fn last_seen(&self, channel: &ChannelId) -> Option<Timestamp> {
        self.last_seen.get(channel).copied()
    }

    /// True if the channel has activity newer than its read marker.
    pub fn is_unread(&self, channel: &ChannelId) -> bool {
        let Some(last) = self.channels.get(channel).and_then(|c| c.last_message_at) else {
            return false;
        };
        self.last_seen(channel).is_none_or(|seen| last > seen)
    }

    // Persistence

    /// State to hand to the persistence collaborator.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            cursor: self.cursor,
            last_seen: self.last_seen.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    /// Restore state loaded from the persistence collaborator.
    ///
    /// Values only move forward: a restored cursor older than the live one is
    /// ignored.
    pub fn restore(&mut self, state: PersistedState) {
        if let Some(cursor) = state.cursor {
            self.advance_cursor(cursor);
        }
        for (channel, ts) in state.last_seen {
            self.mark_seen(&channel, ts);
        }
    }

    /// Channels holding messages, for invariant checks.
    pub fn message_channels(&self) -> Vec<&ChannelId> {
        self.messages.keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use murmur_proto::PresenceStatus;

    use super::*;
    use crate::UploadState;

    fn ts(ms: i64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn msg(id: &str, at: i64) -> Message {
        Message::new(id, "c1", "a1", id, ts(at))
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

    fn c1() -> ChannelId {
        "c1".into()
    }

    #[test]
    fn bound_keeps_most_recent_by_creation_time() {
        let mut store = SyncStore::new(StoreConfig::with_message_bound(2));
        store.upsert(&c1(), ClientMessage::canonical(msg("m1", 0)), ts(100));
        store.upsert(&c1(), ClientMessage::canonical(msg("m2", 10)), ts(100));
        store.upsert(&c1(), ClientMessage::canonical(msg("m3", 20)), ts(100));

        let ids: Vec<&str> = store.ordered_ids(&c1()).iter().map(MessageId::as_str).collect();
        assert_eq!(ids, ["m2", "m3"]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = SyncStore::default();
        store.upsert(&c1(), ClientMessage::canonical(msg("m1", 0)), ts(100));
        let first = store.message(&c1(), &"m1".into()).cloned();

        store.upsert(&c1(), ClientMessage::canonical(msg("m1", 0)), ts(500));
        assert_eq!(store.message(&c1(), &"m1".into()).cloned(), first);
        assert_eq!(first.and_then(|r| r.inserted_at), Some(ts(100)));
    }

    #[test]
    fn optimistic_collapses_into_server_record() {
        let mut store = SyncStore::default();
        store.upsert(&c1(), ClientMessage::canonical(msg("m1", 0)), ts(0));
        store.upsert(&c1(), ClientMessage::canonical(msg("m2", 10)), ts(10));

        let pending = ClientMessage::optimistic(
            msg("local-abc", 20).with_nonce("abc"),
            vec![UploadState { progress: 0.5, preview: Some("blob:x".into()) }],
        );
        store.insert_optimistic(&c1(), pending, ts(20)).unwrap();
        assert_eq!(
            store.message(&c1(), &"local-abc".into()).map(|r| r.status),
            Some(DeliveryStatus::Sending)
        );

        store.reconcile_by_nonce(&c1(), msg("m3", 21).with_nonce("abc"), ts(30));

        let ids: Vec<&str> = store.ordered_ids(&c1()).iter().map(MessageId::as_str).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
        let m3 = store.message(&c1(), &"m3".into()).unwrap();
        assert_eq!(m3.status, DeliveryStatus::Sent);
        assert_eq!(m3.uploads[0].preview.as_deref(), Some("blob:x"));
    }

    #[test]
    fn reconcile_without_match_is_plain_upsert() {
        let mut store = SyncStore::default();
        store.reconcile_by_nonce(&c1(), msg("m1", 0).with_nonce("zzz"), ts(0));
        assert_eq!(store.message_count(&c1()), 1);
    }

    #[test]
    fn duplicate_nonce_is_rejected() {
        let mut store = SyncStore::default();
        let a = ClientMessage::optimistic(msg("local-1", 0).with_nonce("n"), vec![]);
        let b = ClientMessage::optimistic(msg("local-2", 0).with_nonce("n"), vec![]);

        store.insert_optimistic(&c1(), a, ts(0)).unwrap();
        assert_eq!(
            store.insert_optimistic(&c1(), b, ts(0)),
            Err(StoreError::DuplicateNonce { channel: c1(), nonce: "n".into() })
        );
    }

    #[test]
    fn failed_then_retry() {
        let mut store = SyncStore::default();
        let pending = ClientMessage::optimistic(msg("local-1", 0).with_nonce("n"), vec![]);
        store.insert_optimistic(&c1(), pending, ts(0)).unwrap();

        store.mark_failed(&c1(), &"local-1".into(), "503");
        let failed = store.message(&c1(), &"local-1".into()).unwrap();
        assert_eq!(failed.status, DeliveryStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("503"));

        let retried = store.mark_retrying(&c1(), &"local-1".into()).unwrap();
        assert_eq!(retried.status, DeliveryStatus::Sending);
        assert!(store.mark_retrying(&c1(), &"local-1".into()).is_none());
    }

    #[test]
    fn missing_keys_are_ignored() {
        let mut store = SyncStore::default();
        store.remove_message(&c1(), &"nope".into());
        store.remove_channel(&c1());
        store.stop_typing(&c1(), &"a1".into());
        store.mark_failed(&c1(), &"nope".into(), "x");
        store.set_upload_progress(&c1(), &"nope".into(), 3, 0.5);
        store.patch_channel(&ChannelPatch { id: c1(), ..Default::default() });
        store.patch_author(&AuthorPatch { id: "a9".into(), ..Default::default() });

        assert_eq!(store.message_count(&c1()), 0);
        assert!(store.messages(&c1()).is_empty());
        assert!(store.oldest_created_at(&c1()).is_none());
    }

    #[test]
    fn typing_expires_after_timeout_and_restart_extends() {
        let mut store = SyncStore::default();
        let a1: AuthorId = "a1".into();

        store.start_typing(&c1(), &a1, ts(0));
        store.start_typing(&c1(), &a1, ts(5_000));
        assert_eq!(store.typing_marker_count(), 1);

        store.tick(ts(10_000));
        assert_eq!(store.typing(&c1()), vec![a1.clone()]);

        store.tick(ts(15_000));
        assert!(store.typing(&c1()).is_empty());
    }

    #[test]
    fn stop_typing_removes_immediately() {
        let mut store = SyncStore::default();
        store.start_typing(&c1(), &"a1".into(), ts(0));
        store.stop_typing(&c1(), &"a1".into());
        assert!(store.typing(&c1()).is_empty());
        assert!(store.next_typing_deadline().is_none());
    }

    #[test]
    fn remove_channel_drops_messages_and_typing() {
        let mut store = SyncStore::default();
        store.upsert_channel(channel("c1"));
        store.upsert(&c1(), ClientMessage::canonical(msg("m1", 0)), ts(0));
        store.start_typing(&c1(), &"a2".into(), ts(0));

        store.remove_channel(&c1());
        assert!(store.channel(&c1()).is_none());
        assert_eq!(store.message_count(&c1()), 0);
        assert_eq!(store.typing_marker_count(), 0);
    }

    #[test]
    fn session_user_follows_own_author_updates() {
        let mut store = SyncStore::default();
        let me = Author::new("me", "ada");
        store.set_session_user(SessionUser::from_author(&me));
        store.upsert_author(me);

        store.patch_author(&AuthorPatch {
            id: "me".into(),
            status: Some(PresenceStatus::DoNotDisturb),
            bio: Some("hi".into()),
            ..Default::default()
        });
        store.patch_author(&AuthorPatch {
            id: "other".into(),
            username: Some("bob".into()),
            ..Default::default()
        });

        let session = store.session_user().unwrap();
        assert_eq!(session.status, PresenceStatus::DoNotDisturb);
        assert_eq!(session.bio.as_deref(), Some("hi"));
        assert_eq!(session.username, "ada");
        assert_eq!(store.author(&"other".into()).map(|a| a.username.as_str()), Some("bob"));
    }

    #[test]
    fn status_update_for_uncached_session_user_is_kept() {
        let mut store = SyncStore::default();
        store.set_session_user(SessionUser::from_author(&Author::new("me", "ada")));
        let mut changes = store.subscribe();

        store.patch_author(&AuthorPatch {
            id: "me".into(),
            status: Some(PresenceStatus::Idle),
            ..Default::default()
        });

        assert_eq!(store.session_user().map(|s| s.status), Some(PresenceStatus::Idle));
        assert!(store.author(&"me".into()).is_none());
        assert_eq!(changes.try_recv().ok(), Some(StoreChange::SessionUser));
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut store = SyncStore::default();
        store.advance_cursor(ts(10));
        store.advance_cursor(ts(5));
        assert_eq!(store.cursor(), Some(ts(10)));
    }

    #[test]
    fn unread_tracks_read_marker() {
        let mut store = SyncStore::default();
        store.upsert_channel(channel("c1"));
        assert!(!store.is_unread(&c1()));

        store.upsert(&c1(), ClientMessage::canonical(msg("m1", 50)), ts(50));
        assert!(store.is_unread(&c1()));

        store.mark_seen(&c1(), ts(50));
        assert!(!store.is_unread(&c1()));
    }

    #[test]
    fn persisted_state_round_trip() {
        let mut store = SyncStore::default();
        store.advance_cursor(ts(99));
        store.mark_seen(&c1(), ts(40));

        let mut restored = SyncStore::default();
        restored.restore(store.persisted_state());
        assert_eq!(restored.cursor(), Some(ts(99)));
        assert_eq!(restored.last_seen(&c1()), Some(ts(40)));
    }

    #[test]
    fn replace_channels_drops_stale() {
        let mut store = SyncStore::default();
        store.upsert_channel(channel("c1"));
        store.upsert_channel(channel("c2"));
        store.replace_channels(vec![channel("c2"), channel("c3")]);

        let mut ids: Vec<&str> = store.channels().iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["c2", "c3"]);
    }

    #[test]
    fn changes_are_published_after_mutation() {
        let mut store = SyncStore::default();
        let mut rx = store.subscribe();
        store.upsert(&c1(), ClientMessage::canonical(msg("m1", 0)), ts(0));

        assert_eq!(rx.try_recv().unwrap(), StoreChange::Messages { channel: c1() });
    }
}
