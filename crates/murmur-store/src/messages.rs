//! Per-channel message collection.
//!
//! Records are keyed by message id; a separate id index keeps them ordered by
//! (creation time, id). The index is derived state: every mutation rebuilds
//! it from the surviving keys before returning.
//!
//! Eviction re-sorts every record by creation time on each over-capacity
//! insert. Backward pagination inserts records older than the ones already
//! held, so arrival order says nothing about which records are the most
//! recent. The sort is O(n log n) per eviction, which is fine at the default
//! bound of 2000.

use std::collections::HashMap;

use murmur_proto::{MessageId, Timestamp};

use crate::ClientMessage;

/// Messages of one channel.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChannelMessages {
    records: HashMap<MessageId, ClientMessage>,
    /// Ids ordered by (creation time, id) ascending.
    order: Vec<MessageId>,
}

impl ChannelMessages {
    /// Merge a candidate into the record with the same id, stamp its
    /// insertion time, and evict down to `bound`.
    ///
    /// Returns the ids evicted by this call.
    pub(crate) fn upsert(
        &mut self,
        candidate: ClientMessage,
        now: Timestamp,
        bound: usize,
    ) -> Vec<MessageId> {
        let id = candidate.id().clone();
        let record = match self.records.remove(&id) {
            Some(mut existing) => {
                existing.merge(candidate);
                existing
            },
            None => candidate,
        };
        let record = ClientMessage { inserted_at: record.inserted_at.or(Some(now)), ..record };
        self.records.insert(id, record);

        let evicted = self.evict(bound);
        self.rebuild_index();
        evicted
    }

    /// Remove a record. Returns it if present.
    pub(crate) fn remove(&mut self, id: &MessageId) -> Option<ClientMessage> {
        let removed = self.records.remove(id)?;
        self.rebuild_index();
        Some(removed)
    }

    /// Mutate a record in place. The closure must not change the record's
    /// id; creation time may change and is re-indexed.
    pub(crate) fn update<R>(
        &mut self,
        id: &MessageId,
        f: impl FnOnce(&mut ClientMessage) -> R,
    ) -> Option<R> {
        let record = self.records.get_mut(id)?;
        let before = record.created_at();
        let result = f(record);
        debug_assert_eq!(record.id(), id);
        if record.created_at() != before {
            self.rebuild_index();
        }
        Some(result)
    }

    pub(crate) fn get(&self, id: &MessageId) -> Option<&ClientMessage> {
        self.records.get(id)
    }

    /// Ids of records carrying `nonce`, other than `except`, in creation
    /// order.
    pub(crate) fn find_by_nonce_except(
        &self,
        nonce: &str,
        except: &MessageId,
    ) -> Vec<MessageId> {
        self.iter()
            .filter(|r| r.nonce() == Some(nonce) && r.id() != except)
            .map(|r| r.id().clone())
            .collect()
    }

    /// Ids in creation order.
    pub(crate) fn ordered_ids(&self) -> &[MessageId] {
        &self.order
    }

    /// Records in creation order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ClientMessage> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub(crate) fn oldest(&self) -> Option<&ClientMessage> {
        self.order.first().and_then(|id| self.records.get(id))
    }

    pub(crate) fn newest(&self) -> Option<&ClientMessage> {
        self.order.last().and_then(|id| self.records.get(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Drop the oldest records by creation time until at most `bound` remain.
    fn evict(&mut self, bound: usize) -> Vec<MessageId> {
        let excess = self.records.len().saturating_sub(bound);
        if excess == 0 {
            return Vec::new();
        }

        let mut by_age: Vec<(Timestamp, MessageId)> =
            self.records.values().map(|r| (r.created_at(), r.id().clone())).collect();
        by_age.sort_unstable();

        let evicted: Vec<MessageId> = by_age.into_iter().take(excess).map(|(_, id)| id).collect();
        for id in &evicted {
            self.records.remove(id);
        }
        tracing::debug!(count = evicted.len(), bound, "evicted oldest messages");
        evicted
    }

    fn rebuild_index(&mut self) {
        let mut keyed: Vec<(Timestamp, &MessageId)> =
            self.records.values().map(|r| (r.created_at(), r.id())).collect();
        keyed.sort_unstable();
        self.order = keyed.into_iter().map(|(_, id)| id.clone()).collect();

        debug_assert_eq!(self.order.len(), self.records.len());
    }
}

#[cfg(test)]
mod tests {
    use murmur_proto::Message;

    use super::*;

    fn record(id: &str, at: i64) -> ClientMessage {
        ClientMessage::canonical(Message::new(id, "c1", "a1", id, Timestamp::from_millis(at)))
    }

    #[test]
    fn index_follows_creation_time_not_arrival() {
        let mut msgs = ChannelMessages::default();
        let now = Timestamp::from_millis(1000);
        msgs.upsert(record("m3", 30), now, 10);
        msgs.upsert(record("m1", 10), now, 10);
        msgs.upsert(record("m2", 20), now, 10);

        let ids: Vec<&str> = msgs.ordered_ids().iter().map(MessageId::as_str).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
    }

    #[test]
    fn eviction_drops_oldest_even_when_it_arrived_last() {
        let mut msgs = ChannelMessages::default();
        let now = Timestamp::from_millis(1000);
        msgs.upsert(record("m2", 20), now, 2);
        msgs.upsert(record("m3", 30), now, 2);
        let evicted = msgs.upsert(record("m1", 10), now, 2);

        assert_eq!(evicted, vec![MessageId::from("m1")]);
        assert_eq!(msgs.len(), 2);
        assert!(msgs.get(&"m1".into()).is_none());
    }

    #[test]
    fn equal_creation_times_break_ties_by_id() {
        let mut msgs = ChannelMessages::default();
        let now = Timestamp::from_millis(0);
        msgs.upsert(record("b", 5), now, 10);
        msgs.upsert(record("a", 5), now, 10);

        assert_eq!(msgs.oldest().map(|r| r.id().as_str()), Some("a"));
        assert_eq!(msgs.newest().map(|r| r.id().as_str()), Some("b"));
    }

    #[test]
    fn update_reindexes_when_creation_time_changes() {
        let mut msgs = ChannelMessages::default();
        let now = Timestamp::from_millis(0);
        msgs.upsert(record("m1", 10), now, 10);
        msgs.upsert(record("m2", 20), now, 10);

        msgs.update(&"m1".into(), |r| r.message.created_at = Timestamp::from_millis(30));
        assert_eq!(msgs.newest().map(|r| r.id().as_str()), Some("m1"));
    }
}
