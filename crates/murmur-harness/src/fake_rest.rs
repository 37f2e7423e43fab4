//! In-memory REST server.
//!
//! Serves message history, channels and authors from memory with the same
//! paging semantics as the real API, records every call, and can be told to
//! fail the next request.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use murmur_client::{MessageCreate, MessageQuery, RestApi, RestError};
use murmur_proto::{
    Author, AuthorId, Channel, ChannelId, Message, MessageId, MessagePatch, Timestamp,
};

/// A recorded REST call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestCall {
    /// `fetch_messages`
    FetchMessages {
        /// Channel paged
        channel: ChannelId,
        /// Page query
        query: MessageQuery,
    },
    /// `create_message`
    CreateMessage {
        /// Target channel
        channel: ChannelId,
        /// Submitted nonce
        nonce: String,
    },
    /// `edit_message`
    EditMessage {
        /// Channel of the message
        channel: ChannelId,
        /// Edited message
        id: MessageId,
    },
    /// `delete_message`
    DeleteMessage {
        /// Channel of the message
        channel: ChannelId,
        /// Deleted message
        id: MessageId,
    },
    /// `fetch_channels`
    FetchChannels,
    /// `fetch_author`
    FetchAuthor(AuthorId),
}

#[derive(Default)]
struct FakeState {
    /// Per channel, sorted by (created_at, id).
    messages: HashMap<ChannelId, Vec<Message>>,
    channels: Vec<Channel>,
    authors: HashMap<AuthorId, Author>,
    failures: VecDeque<RestError>,
    calls: Vec<RestCall>,
    next_id: u64,
    /// Author of messages created through this server.
    author: AuthorId,
}

impl FakeState {
    fn sort(&mut self, channel: &ChannelId) {
        if let Some(messages) = self.messages.get_mut(channel) {
            messages.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        }
    }

    fn record(&mut self, call: RestCall) -> Result<(), RestError> {
        self.calls.push(call);
        self.failures.pop_front().map_or(Ok(()), Err)
    }
}

/// [`RestApi`] served from memory.
///
/// Clones share one server.
#[derive(Clone, Default)]
pub struct FakeRest {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRest {
    /// Empty server. Messages it creates are attributed to `author`.
    pub fn new(author: impl Into<AuthorId>) -> Self {
        let state = FakeState { author: author.into(), ..FakeState::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed history. Messages are filed under their own channel id.
    pub fn insert_messages(&self, messages: impl IntoIterator<Item = Message>) {
        let mut state = self.state();
        let mut touched = Vec::new();
        for message in messages {
            touched.push(message.channel_id.clone());
            state.messages.entry(message.channel_id.clone()).or_default().push(message);
        }
        for channel in touched {
            state.sort(&channel);
        }
    }

    /// Seed the channel list.
    pub fn set_channels(&self, channels: Vec<Channel>) {
        self.state().channels = channels;
    }

    /// Seed an author profile.
    pub fn insert_author(&self, author: Author) {
        self.state().authors.insert(author.id.clone(), author);
    }

    /// Fail the next call with `error`. Queued failures apply in order.
    pub fn fail_next(&self, error: RestError) {
        self.state().failures.push_back(error);
    }

    /// Every call so far.
    pub fn calls(&self) -> Vec<RestCall> {
        self.state().calls.clone()
    }

    /// Number of `fetch_messages` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.state().calls.iter().filter(|c| matches!(c, RestCall::FetchMessages { .. })).count()
    }
}

#[async_trait]
impl RestApi for FakeRest {
    async fn fetch_messages(
        &self,
        channel: &ChannelId,
        query: MessageQuery,
    ) -> Result<Vec<Message>, RestError> {
        let mut state = self.state();
        state.record(RestCall::FetchMessages { channel: channel.clone(), query })?;

        let history = state.messages.get(channel).map(Vec::as_slice).unwrap_or_default();
        let matching: Vec<&Message> = history
            .iter()
            .filter(|m| query.after.is_none_or(|after| m.created_at > after))
            .filter(|m| query.before.is_none_or(|before| m.created_at < before))
            .collect();

        // Pages grow away from `after`; everything else pages back from newest
        let page: Vec<Message> = if query.after.is_some() {
            matching.into_iter().take(query.limit).cloned().collect()
        } else {
            let skip = matching.len().saturating_sub(query.limit);
            matching.into_iter().skip(skip).cloned().collect()
        };
        Ok(page)
    }

    async fn create_message(
        &self,
        channel: &ChannelId,
        body: &MessageCreate,
    ) -> Result<Message, RestError> {
        let mut state = self.state();
        let call = RestCall::CreateMessage { channel: channel.clone(), nonce: body.nonce.clone() };
        state.record(call)?;

        state.next_id += 1;
        let id = format!("srv-{}", state.next_id);
        let newest = state.messages.get(channel).and_then(|history| history.last());
        let created_at =
            newest.map_or(Timestamp::EPOCH, |m| m.created_at + Duration::from_millis(1));

        let author = state.author.clone();
        let content = body.content.clone();
        let mut message = Message::new(id, channel.clone(), author, content, created_at)
            .with_nonce(body.nonce.clone());
        message.attachments.clone_from(&body.attachments);

        state.messages.entry(channel.clone()).or_default().push(message.clone());
        state.sort(channel);
        Ok(message)
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        id: &MessageId,
        content: &str,
    ) -> Result<Message, RestError> {
        let mut state = self.state();
        state.record(RestCall::EditMessage { channel: channel.clone(), id: id.clone() })?;

        let message = state
            .messages
            .get_mut(channel)
            .and_then(|history| history.iter_mut().find(|m| &m.id == id))
            .ok_or(RestError::Status(404))?;
        let updated_at = message.created_at + Duration::from_millis(1);
        message.apply(&MessagePatch {
            id: id.clone(),
            channel_id: channel.clone(),
            content: Some(content.to_owned()),
            attachments: None,
            embeds: None,
            updated_at: Some(updated_at),
        });
        Ok(message.clone())
    }

    async fn delete_message(&self, channel: &ChannelId, id: &MessageId) -> Result<(), RestError> {
        let mut state = self.state();
        state.record(RestCall::DeleteMessage { channel: channel.clone(), id: id.clone() })?;

        let history = state.messages.get_mut(channel).ok_or(RestError::Status(404))?;
        let before = history.len();
        history.retain(|m| &m.id != id);
        if history.len() == before {
            return Err(RestError::Status(404));
        }
        Ok(())
    }

    async fn fetch_channels(&self) -> Result<Vec<Channel>, RestError> {
        let mut state = self.state();
        state.record(RestCall::FetchChannels)?;
        Ok(state.channels.clone())
    }

    async fn fetch_author(&self, id: &AuthorId) -> Result<Author, RestError> {
        let mut state = self.state();
        state.record(RestCall::FetchAuthor(id.clone()))?;
        state.authors.get(id).cloned().ok_or(RestError::Status(404))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> FakeRest {
        let rest = FakeRest::new("me");
        rest.insert_messages((1..=10).map(|i| {
            Message::new(format!("m{i}"), "c1", "a1", "x", Timestamp::from_millis(i * 10))
        }));
        rest
    }

    fn ids(page: &[Message]) -> Vec<&str> {
        page.iter().map(|m| m.id.as_str()).collect()
    }

    #[tokio::test]
    async fn latest_page_is_newest_in_ascending_order() {
        let rest = seeded();
        let page = rest.fetch_messages(&"c1".into(), MessageQuery::latest(3)).await.unwrap();
        assert_eq!(ids(&page), ["m8", "m9", "m10"]);
    }

    #[tokio::test]
    async fn before_pages_backwards() {
        let rest = seeded();
        let query = MessageQuery::before(Timestamp::from_millis(79), 3);
        let page = rest.fetch_messages(&"c1".into(), query).await.unwrap();
        assert_eq!(ids(&page), ["m5", "m6", "m7"]);
    }

    #[tokio::test]
    async fn after_pages_forwards() {
        let rest = seeded();
        let query = MessageQuery::after(Timestamp::from_millis(20), 2);
        let page = rest.fetch_messages(&"c1".into(), query).await.unwrap();
        assert_eq!(ids(&page), ["m3", "m4"]);
    }

    #[tokio::test]
    async fn queued_failure_applies_once() {
        let rest = seeded();
        rest.fail_next(RestError::Status(503));

        let first = rest.fetch_messages(&"c1".into(), MessageQuery::latest(1)).await;
        let second = rest.fetch_messages(&"c1".into(), MessageQuery::latest(1)).await;
        assert_eq!(first, Err(RestError::Status(503)));
        assert!(second.is_ok());
        assert_eq!(rest.fetch_count(), 2);
    }

    #[tokio::test]
    async fn created_message_echoes_nonce_after_newest() {
        let rest = seeded();
        let body = MessageCreate { content: "hi".into(), nonce: "abc".into(), attachments: vec![] };
        let created = rest.create_message(&"c1".into(), &body).await.unwrap();

        assert_eq!(created.nonce.as_deref(), Some("abc"));
        assert_eq!(created.created_at, Timestamp::from_millis(101));
        assert_eq!(created.author_id, AuthorId::from("me"));
    }
}
