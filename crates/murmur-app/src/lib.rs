//! Application layer of the Murmur sync core.
//!
//! Everything between the transport and the UI: the per-channel paginated
//! view, the bridge from stream events to the store, optimistic sends, and
//! the session that drives REST calls on behalf of all of them.
//!
//! # Architecture
//!
//! ```text
//! EventStreamClient ──> StoreSink ──> SyncStore <── Session <── host UI
//!                        (bridge)        │            │
//!                                        └──> PaginatedView ──> ViewAction
//! ```
//!
//! The view is Sans-IO: the host feeds [`ViewEvent`]s and executes the
//! returned [`ViewAction`]s. [`Session`] executes fetches itself and hands
//! the rest (scrolling, rendering) back to the host.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod bridge;
mod config;
mod error;
mod event;
mod geometry;
mod outbox;
mod session;
mod view;

pub use action::{FetchRequest, ViewAction};
pub use bridge::{StoreSink, apply_event};
pub use config::{DEFAULT_PAGE_SIZE, ViewConfig};
pub use error::{FetchError, SessionError};
pub use event::ViewEvent;
pub use geometry::ItemHeights;
pub use outbox::{LOCAL_ID_PREFIX, Outbox, PendingFile, Submission};
pub use session::Session;
pub use view::{PaginatedView, ViewPhase};
