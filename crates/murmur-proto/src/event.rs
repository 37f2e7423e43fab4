//! Gateway envelope and typed events.
//!
//! Every SSE frame carries one JSON envelope `{ t, d?, ts? }`. The tag `t`
//! selects the payload shape of `d`; `ts` is the server's event time, used by
//! the client as its resume cursor.
//!
//! Decoding is two-step so the caller can always advance the cursor, even
//! for frames whose tag it does not understand:
//!
//! 1. [`Envelope::parse`] validates the outer object.
//! 2. [`Envelope::into_event`] maps known tags to a [`GatewayEvent`];
//!    unknown tags yield `Ok(None)` for forward compatibility.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    AuthorId, Channel, ChannelId, ChannelPatch, Message, MessageId, MessagePatch, Timestamp,
    error::{ProtocolError, Result},
    model::AuthorPatch,
};

/// Outer JSON object of a gateway frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event tag.
    pub t: String,
    /// Tag-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
    /// Server event time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Timestamp>,
}

/// Event tags the client consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// `CHANNEL_CREATED`
    ChannelCreated,
    /// `CHANNEL_UPDATED`
    ChannelUpdated,
    /// `CHANNEL_DELETED`
    ChannelDeleted,
    /// `MESSAGE_CREATED`
    MessageCreated,
    /// `MESSAGE_UPDATED`
    MessageUpdated,
    /// `MESSAGE_DELETED`
    MessageDeleted,
    /// `AUTHOR_UPDATED`
    AuthorUpdated,
    /// `TYPING_STARTED`
    TypingStarted,
    /// `HEARTBEAT`
    Heartbeat,
}

impl EventTag {
    /// All consumed tags.
    pub const ALL: [Self; 9] = [
        Self::ChannelCreated,
        Self::ChannelUpdated,
        Self::ChannelDeleted,
        Self::MessageCreated,
        Self::MessageUpdated,
        Self::MessageDeleted,
        Self::AuthorUpdated,
        Self::TypingStarted,
        Self::Heartbeat,
    ];

    /// Wire name of the tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChannelCreated => "CHANNEL_CREATED",
            Self::ChannelUpdated => "CHANNEL_UPDATED",
            Self::ChannelDeleted => "CHANNEL_DELETED",
            Self::MessageCreated => "MESSAGE_CREATED",
            Self::MessageUpdated => "MESSAGE_UPDATED",
            Self::MessageDeleted => "MESSAGE_DELETED",
            Self::AuthorUpdated => "AUTHOR_UPDATED",
            Self::TypingStarted => "TYPING_STARTED",
            Self::Heartbeat => "HEARTBEAT",
        }
    }

    /// Tag for a wire name. `None` for tags this client does not consume.
    pub fn from_wire(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

/// Payload of `CHANNEL_DELETED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Deleted channel.
    pub id: ChannelId,
}

/// Payload of `MESSAGE_DELETED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// Deleted message.
    pub id: MessageId,
    /// Channel it belonged to.
    pub channel_id: ChannelId,
}

/// Payload of `TYPING_STARTED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStarted {
    /// Channel being typed in.
    pub channel_id: ChannelId,
    /// Author typing.
    pub author_id: AuthorId,
}

/// A decoded gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A channel was created (full record).
    ChannelCreated(Channel),
    /// A channel changed (partial record).
    ChannelUpdated(ChannelPatch),
    /// A channel was deleted.
    ChannelDeleted(ChannelRef),
    /// A message was confirmed (full record, may echo a client nonce).
    MessageCreated(Message),
    /// A message was edited (partial record).
    MessageUpdated(MessagePatch),
    /// A message was deleted.
    MessageDeleted(MessageRef),
    /// An author's profile or presence changed (partial record).
    AuthorUpdated(AuthorPatch),
    /// An author started typing.
    TypingStarted(TypingStarted),
    /// Keep-alive, no state change.
    Heartbeat,
}

impl GatewayEvent {
    /// Tag this event is carried under.
    pub const fn tag(&self) -> EventTag {
        match self {
            Self::ChannelCreated(_) => EventTag::ChannelCreated,
            Self::ChannelUpdated(_) => EventTag::ChannelUpdated,
            Self::ChannelDeleted(_) => EventTag::ChannelDeleted,
            Self::MessageCreated(_) => EventTag::MessageCreated,
            Self::MessageUpdated(_) => EventTag::MessageUpdated,
            Self::MessageDeleted(_) => EventTag::MessageDeleted,
            Self::AuthorUpdated(_) => EventTag::AuthorUpdated,
            Self::TypingStarted(_) => EventTag::TypingStarted,
            Self::Heartbeat => EventTag::Heartbeat,
        }
    }

    /// Wrap this event in an envelope, e.g. for a test server.
    pub fn into_envelope(self, ts: Option<Timestamp>) -> Envelope {
        let tag = self.tag().as_str().to_owned();
        let d = match self {
            Self::ChannelCreated(v) => serde_json::to_value(v),
            Self::ChannelUpdated(v) => serde_json::to_value(v),
            Self::ChannelDeleted(v) => serde_json::to_value(v),
            Self::MessageCreated(v) => serde_json::to_value(v),
            Self::MessageUpdated(v) => serde_json::to_value(v),
            Self::MessageDeleted(v) => serde_json::to_value(v),
            Self::AuthorUpdated(v) => serde_json::to_value(v),
            Self::TypingStarted(v) => serde_json::to_value(v),
            Self::Heartbeat => Ok(Value::Null),
        };
        Envelope { t: tag, d: d.ok().filter(|v| !v.is_null()), ts }
    }
}

impl Envelope {
    /// Parse the joined `data:` text of one frame.
    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))
    }

    /// Known tag of this envelope. `None` for unconsumed tags.
    pub fn tag(&self) -> Option<EventTag> {
        EventTag::from_wire(&self.t)
    }

    /// Decode the payload for this envelope's tag.
    ///
    /// Returns `Ok(None)` for tags this client does not consume.
    pub fn into_event(self) -> Result<Option<GatewayEvent>> {
        let Some(tag) = self.tag() else {
            return Ok(None);
        };

        let event = match tag {
            EventTag::Heartbeat => GatewayEvent::Heartbeat,
            EventTag::ChannelCreated => GatewayEvent::ChannelCreated(payload(tag, self.d)?),
            EventTag::ChannelUpdated => GatewayEvent::ChannelUpdated(payload(tag, self.d)?),
            EventTag::ChannelDeleted => GatewayEvent::ChannelDeleted(payload(tag, self.d)?),
            EventTag::MessageCreated => GatewayEvent::MessageCreated(payload(tag, self.d)?),
            EventTag::MessageUpdated => GatewayEvent::MessageUpdated(payload(tag, self.d)?),
            EventTag::MessageDeleted => GatewayEvent::MessageDeleted(payload(tag, self.d)?),
            EventTag::AuthorUpdated => GatewayEvent::AuthorUpdated(payload(tag, self.d)?),
            EventTag::TypingStarted => GatewayEvent::TypingStarted(payload(tag, self.d)?),
        };
        Ok(Some(event))
    }

    /// Serialize as the text of one SSE frame, terminator included.
    pub fn to_sse(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("data: {json}\n\n")
    }
}

fn payload<T: DeserializeOwned>(tag: EventTag, d: Option<Value>) -> Result<T> {
    let value = d.ok_or(ProtocolError::MissingPayload { tag: tag.as_str() })?;
    serde_json::from_value(value)
        .map_err(|e| ProtocolError::InvalidPayload { tag: tag.as_str(), reason: e.to_string() })
}
