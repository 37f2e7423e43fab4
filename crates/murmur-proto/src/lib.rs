//! Wire protocol for Murmur.
//!
//! Entity types shared by the stream client, the store and the REST
//! collaborator, plus the decoding pipeline for the server's event feed:
//!
//! ```text
//! bytes ──> SseDecoder ──> data text ──> Envelope ──> GatewayEvent
//! ```
//!
//! # Components
//!
//! - [`SseDecoder`]: Incremental `text/event-stream` frame splitter
//! - [`Envelope`]: The `{ t, d, ts }` JSON object carried by each frame
//! - [`GatewayEvent`]: Typed event for every tag the client consumes
//! - [`Channel`], [`Author`], [`Message`]: Canonical entities, with patch
//!   types for partial updates

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod ids;
pub mod model;
pub mod sse;
pub mod time;

pub use error::{ProtocolError, Result};
pub use event::{
    ChannelRef, Envelope, EventTag, GatewayEvent, MessageRef, TypingStarted,
};
pub use ids::{AuthorId, ChannelId, MessageId};
pub use model::{
    Attachment, Author, AuthorPatch, Channel, ChannelPatch, Embed, Message, MessagePatch,
    MessageType, PresenceStatus,
};
pub use sse::{DEFAULT_MAX_FRAME_BYTES, SseDecoder};
pub use time::Timestamp;
