//! Network side of the Murmur sync core.
//!
//! # Components
//!
//! - [`EventStreamClient`]: Long-lived server event subscription with
//!   resume cursor and reconnect backoff
//! - [`Connector`]: Transport seam of the stream client ([`HttpConnector`]
//!   in production)
//! - [`RestApi`]: REST collaborator for history, submissions and listings
//!   ([`HttpRest`] in production)
//! - [`SystemEnv`]: Production [`Environment`](murmur_core::Environment)
//!
//! Network failures never reach the owner of a stream. They are retried and
//! reported through [`StreamHandler::on_status`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connector;
mod error;
mod handler;
mod rest;
mod stream;
mod system_env;

pub use config::StreamConfig;
pub use connector::{ByteStream, Connector, EVENT_STREAM, HttpConnector, check_response};
pub use error::{RestError, StreamError};
pub use handler::{ConnectionStatus, StreamHandler};
pub use rest::{HttpRest, MessageCreate, MessageQuery, RestApi};
pub use stream::{EventStreamClient, StreamHandle};
pub use system_env::SystemEnv;
