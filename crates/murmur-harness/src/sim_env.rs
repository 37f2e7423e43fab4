//! Simulated environment.
//!
//! Virtual time starts at zero and only moves when a test advances it or
//! when driver code sleeps. Randomness comes from a seeded ChaCha stream, so
//! nonces are the same on every run with the same seed.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    future::Future,
    ops::Sub,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use murmur_core::Environment;
use murmur_proto::Timestamp;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Point on the virtual monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the simulation started.
    pub fn elapsed_since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

struct SimState {
    elapsed: Duration,
    /// Wall clock at simulation start.
    epoch: Timestamp,
    rng: ChaCha8Rng,
    sleeps: Vec<Duration>,
}

/// Deterministic [`Environment`] for tests.
///
/// Clones share one clock, RNG and sleep log.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv").field("now", &self.now()).finish_non_exhaustive()
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl SimEnv {
    /// Environment with a seeded RNG and the wall clock at the Unix epoch.
    pub fn with_seed(seed: u64) -> Self {
        Self::starting_at(seed, Timestamp::EPOCH)
    }

    /// Environment whose wall clock starts at `epoch`.
    pub fn starting_at(seed: u64, epoch: Timestamp) -> Self {
        let state = SimState {
            elapsed: Duration::ZERO,
            epoch,
            rng: ChaCha8Rng::seed_from_u64(seed),
            sleeps: Vec::new(),
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move virtual time forward.
    pub fn advance(&self, by: Duration) {
        self.state().elapsed += by;
    }

    /// Every duration driver code slept for, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.state().elapsed)
    }

    fn wall_clock(&self) -> Timestamp {
        let state = self.state();
        state.epoch + state.elapsed
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        {
            let mut state = self.state();
            state.sleeps.push(duration);
            state.elapsed += duration;
        }
        // Let other tasks observe the state change before the sleeper resumes
        tokio::task::yield_now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.state().rng.fill_bytes(buffer);
    }
}
