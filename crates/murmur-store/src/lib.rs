//! Client-side sync store.
//!
//! [`SyncStore`] is the single source of truth for channels, authors and
//! per-channel messages on the client. Stream events, REST completions,
//! optimistic sends and pagination merges all land here through total
//! mutation operations: a missing key is treated as empty, never as an error.
//!
//! # Components
//!
//! - [`SyncStore`]: Canonical state and its mutations
//! - [`ClientMessage`]: Canonical message plus client-only delivery metadata
//! - [`StoreChange`]: Change notifications for subscribed readers
//! - [`Persistence`]: External collaborator holding the resume cursor and
//!   read markers across sessions
//!
//! # Invariants
//!
//! - Exactly one record per (channel, message id).
//! - Per channel, at most [`StoreConfig::message_bound`] records, always the
//!   most recent by creation time.
//! - An optimistic record confirmed by the server collapses into one record
//!   keyed by the server id.
//! - At most one live typing deadline per (channel, author).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod config;
mod error;
mod messages;
mod persist;
mod record;
mod session;
mod store;
mod typing;

pub use change::StoreChange;
pub use config::{DEFAULT_MESSAGE_BOUND, DEFAULT_TYPING_TIMEOUT, StoreConfig};
pub use error::{PersistError, StoreError};
pub use persist::{FilePersistence, MemoryPersistence, PersistedState, Persistence};
pub use record::{ClientMessage, DeliveryStatus, UploadState};
pub use session::SessionUser;
pub use store::{SharedStore, SyncStore, lock};
