//! Environment abstraction for deterministic testing.
//!
//! Decouples sync logic from system resources (time, randomness). Production
//! code uses the system clock and OS entropy; simulation uses a virtual clock
//! and a seeded RNG so every run is reproducible.

use std::{future::Future, time::Duration};

use murmur_proto::Timestamp;

/// Abstract environment providing time, randomness, and async sleep.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `wall_clock()` is the same clock the server stamps events with
///   (milliseconds since the Unix epoch)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type.
    ///
    /// Production environments use `std::time::Instant`, simulation
    /// environments a virtual instant.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time.
    ///
    /// Used for cache-insertion stamps, optimistic creation times and typing
    /// deadlines.
    fn wall_clock(&self) -> Timestamp;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code (reconnect backoff) awaits this; state machines take
    /// time as a parameter instead.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a client correlation nonce (32 lowercase hex digits).
    fn nonce(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
