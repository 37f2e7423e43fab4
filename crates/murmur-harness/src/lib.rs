//! Deterministic test harness for Murmur.
//!
//! Test doubles for every effect the sync core has, so whole sessions run
//! without a network or a wall clock:
//!
//! - [`SimEnv`]: Virtual clock and seeded RNG. Sleeps are recorded and
//!   advance the clock instead of waiting.
//! - [`ScriptedConnector`]: Event stream transport that replays a script of
//!   failures and frame bodies, recording every URL it was asked to open.
//! - [`FakeRest`]: In-memory REST server that records every call.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties of a [`SyncStore`] that must
//! hold after any sequence of operations. Use
//! [`InvariantRegistry::standard()`] for the store's structural invariants.
//!
//! [`SyncStore`]: murmur_store::SyncStore

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fake_rest;
pub mod invariants;
pub mod scripted;
pub mod sim_env;

pub use fake_rest::{FakeRest, RestCall};
pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, MessageBound, OrderedIndex, SentHasNoError,
    UniqueNonces, Violation,
};
pub use scripted::{Script, ScriptedConnector, frame};
pub use sim_env::{SimEnv, SimInstant};
