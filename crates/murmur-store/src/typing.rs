//! Typing markers.
//!
//! One deadline per (channel, author) pair in a [`TimerQueue`]. A marker is
//! live exactly while its deadline is armed, so "at most one timer per pair"
//! holds by construction.

use std::time::Duration;

use murmur_core::TimerQueue;
use murmur_proto::{AuthorId, ChannelId, Timestamp};

type TypingKey = (ChannelId, AuthorId);

#[derive(Debug, Clone)]
pub(crate) struct TypingTracker {
    timers: TimerQueue<TypingKey, Timestamp>,
    timeout: Duration,
}

impl TypingTracker {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self { timers: TimerQueue::new(), timeout }
    }

    /// Arm (or re-arm) the marker. Returns true if the pair was not typing.
    pub(crate) fn start(&mut self, channel: ChannelId, author: AuthorId, now: Timestamp) -> bool {
        self.timers.schedule((channel, author), now + self.timeout).is_none()
    }

    /// Drop the marker. Returns true if one was live.
    pub(crate) fn stop(&mut self, channel: &ChannelId, author: &AuthorId) -> bool {
        self.timers.cancel(&(channel.clone(), author.clone())).is_some()
    }

    /// Remove every marker whose deadline passed.
    pub(crate) fn expire(&mut self, now: Timestamp) -> Vec<TypingKey> {
        self.timers.expire(now)
    }

    pub(crate) fn clear_channel(&mut self, channel: &ChannelId) {
        self.timers.cancel_where(|(c, _)| c == channel);
    }

    pub(crate) fn deadline(&self, channel: &ChannelId, author: &AuthorId) -> Option<Timestamp> {
        self.timers.deadline(&(channel.clone(), author.clone()))
    }

    pub(crate) fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    /// Authors typing in `channel`, sorted.
    pub(crate) fn typing(&self, channel: &ChannelId) -> Vec<AuthorId> {
        let mut authors: Vec<AuthorId> = self
            .timers
            .keys()
            .filter(|(c, _)| c == channel)
            .map(|(_, author)| author.clone())
            .collect();
        authors.sort();
        authors
    }

    pub(crate) fn live_count(&self) -> usize {
        self.timers.len()
    }
}
