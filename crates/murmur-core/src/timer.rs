//! Keyed, cancellable deadlines.
//!
//! A [`TimerQueue`] is a Sans-IO timer wheel: callers arm a deadline per key
//! and periodically hand in the current time; [`TimerQueue::expire`] returns
//! every key whose deadline has passed. Nothing runs in the background, so a
//! test advances virtual time simply by passing a later `now`.
//!
//! # Invariants
//!
//! - At most one live deadline per key. Re-arming a key cancels the prior
//!   deadline.
//! - `expire` yields keys in deadline order; equal deadlines fire in the
//!   order they were armed.

use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
};

/// Deadlines keyed by `K`, measured in instants of type `I`.
#[derive(Debug, Clone)]
pub struct TimerQueue<K, I> {
    /// Live deadline and arm sequence per key.
    armed: HashMap<K, (I, u64)>,
    /// Keys ordered by (deadline, arm sequence).
    queue: BTreeMap<(I, u64), K>,
    /// Monotonic arm counter, breaks ties between equal deadlines.
    seq: u64,
}

impl<K, I> Default for TimerQueue<K, I> {
    fn default() -> Self {
        Self { armed: HashMap::new(), queue: BTreeMap::new(), seq: 0 }
    }
}

impl<K, I> TimerQueue<K, I>
where
    K: Clone + Eq + Hash,
    I: Copy + Ord,
{
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key` to fire at `deadline`, replacing any live deadline.
    ///
    /// Returns the deadline that was cancelled, if any.
    pub fn schedule(&mut self, key: K, deadline: I) -> Option<I> {
        let previous = self.cancel(&key);
        self.seq += 1;
        self.queue.insert((deadline, self.seq), key.clone());
        self.armed.insert(key, (deadline, self.seq));
        previous
    }

    /// Cancel the deadline for `key`. Returns it if one was live.
    pub fn cancel(&mut self, key: &K) -> Option<I> {
        let (deadline, seq) = self.armed.remove(key)?;
        self.queue.remove(&(deadline, seq));
        Some(deadline)
    }

    /// Live deadline for `key`.
    pub fn deadline(&self, key: &K) -> Option<I> {
        self.armed.get(key).map(|(deadline, _)| *deadline)
    }

    /// True if `key` has a live deadline.
    pub fn is_armed(&self, key: &K) -> bool {
        self.armed.contains_key(key)
    }

    /// Earliest live deadline. Hosts use this to schedule their next tick.
    pub fn next_deadline(&self) -> Option<I> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return every key whose deadline is at or before `now`.
    pub fn expire(&mut self, now: I) -> Vec<K> {
        let mut fired = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let key = entry.remove();
            self.armed.remove(&key);
            fired.push(key);
        }
        if !fired.is_empty() {
            tracing::trace!(count = fired.len(), "timers expired");
        }
        fired
    }

    /// Cancel every deadline whose key matches `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) {
        let keys: Vec<K> = self.armed.keys().filter(|k| predicate(k)).cloned().collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    /// Keys with a live deadline, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.armed.keys()
    }

    /// Number of live deadlines.
    pub fn len(&self) -> usize {
        self.armed.len()
    }

    /// True if no deadline is live.
    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_at_deadline_not_before() {
        let mut timers = TimerQueue::new();
        timers.schedule("a", 10u64);

        assert!(timers.expire(9).is_empty());
        assert_eq!(timers.expire(10), vec!["a"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn reschedule_cancels_prior_deadline() {
        let mut timers = TimerQueue::new();
        timers.schedule("a", 10u64);
        assert_eq!(timers.schedule("a", 20), Some(10));

        assert_eq!(timers.len(), 1);
        assert!(timers.expire(15).is_empty());
        assert_eq!(timers.expire(20), vec!["a"]);
    }

    #[test]
    fn cancel_removes_deadline() {
        let mut timers = TimerQueue::new();
        timers.schedule("a", 10u64);

        assert_eq!(timers.cancel(&"a"), Some(10));
        assert_eq!(timers.cancel(&"a"), None);
        assert!(timers.expire(100).is_empty());
    }

    #[test]
    fn expiry_order_follows_deadline_then_arm_order() {
        let mut timers = TimerQueue::new();
        timers.schedule("late", 30u64);
        timers.schedule("first", 10);
        timers.schedule("second", 10);

        assert_eq!(timers.next_deadline(), Some(10));
        assert_eq!(timers.expire(30), vec!["first", "second", "late"]);
    }

    #[test]
    fn cancel_where_filters_by_key() {
        let mut timers = TimerQueue::new();
        timers.schedule(("c1", "a1"), 10u64);
        timers.schedule(("c1", "a2"), 10);
        timers.schedule(("c2", "a1"), 10);

        timers.cancel_where(|(channel, _)| *channel == "c1");
        assert_eq!(timers.expire(10), vec![("c2", "a1")]);
    }
}
