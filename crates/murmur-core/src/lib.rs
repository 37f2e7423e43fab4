//! Core primitives for Murmur.
//!
//! Everything time-dependent in the sync core goes through these types so
//! tests can drive virtual time instead of waiting on the wall clock.
//!
//! # Components
//!
//! - [`Environment`]: Injected clock, sleep and randomness
//! - [`TimerQueue`]: Keyed, cancellable deadlines polled by the owner
//! - [`Backoff`]: Multiplicative reconnect delay with a ceiling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;
pub mod env;
pub mod timer;

pub use backoff::Backoff;
pub use env::Environment;
pub use timer::TimerQueue;
