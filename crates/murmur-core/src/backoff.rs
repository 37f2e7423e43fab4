//! Reconnect delay schedule.
//!
//! Delays start at [`INITIAL_DELAY`] and grow by [`MULTIPLIER`] after every
//! failure up to [`MAX_DELAY`]. A successful connection resets the schedule.
//! After `k` consecutive failures the wait before attempt `k + 1` is
//! `min(500ms * 1.5^(k-1), 10s)`.

use std::time::Duration;

/// First retry delay.
pub const INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Ceiling on the retry delay.
pub const MAX_DELAY: Duration = Duration::from_secs(10);

/// Growth factor between consecutive delays.
pub const MULTIPLIER: f64 = 1.5;

/// Multiplicative backoff with a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
    failures: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, MAX_DELAY, MULTIPLIER)
    }
}

impl Backoff {
    /// Create a schedule. `initial` is clamped to `max`.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        let initial = initial.min(max);
        Self { initial, max, multiplier: multiplier.max(1.0), current: initial, failures: 0 }
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.failures = self.failures.saturating_add(1);
        self.current = self.current.mul_f64(self.multiplier).min(self.max);
        delay
    }

    /// Delay the next failure would wait, without recording one.
    pub fn peek(&self) -> Duration {
        self.current
    }

    /// Consecutive failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Restart the schedule after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delays() {
        let mut backoff = Backoff::default();
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(750));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1125));
        assert_eq!(backoff.failures(), 3);
    }

    #[test]
    fn caps_at_ten_seconds() {
        let mut backoff = Backoff::default();
        for _ in 0..20 {
            let _ = backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), MAX_DELAY);
    }

    #[test]
    fn reset_restarts_schedule() {
        let mut backoff = Backoff::default();
        let _ = backoff.next_delay();
        let _ = backoff.next_delay();
        backoff.reset();

        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), INITIAL_DELAY);
    }
}
