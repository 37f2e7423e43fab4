//! Standard store invariants.

use std::collections::HashSet;

use murmur_store::{ClientMessage, DeliveryStatus, SyncStore};

use super::{Invariant, InvariantResult, Violation};

/// Per channel, stored messages never exceed the configured bound.
pub struct MessageBound;

impl Invariant for MessageBound {
    fn name(&self) -> &'static str {
        "message_bound"
    }

    fn check(&self, store: &SyncStore) -> InvariantResult {
        let bound = store.config().message_bound;
        for channel in store.message_channels() {
            let count = store.message_count(channel);
            if count > bound {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("channel {channel}: {count} messages, bound {bound}"),
                });
            }
        }
        Ok(())
    }
}

/// The ordered id index lists every record exactly once, sorted by
/// (creation time, id), and every record is filed under its own channel.
pub struct OrderedIndex;

impl Invariant for OrderedIndex {
    fn name(&self) -> &'static str {
        "ordered_index"
    }

    fn check(&self, store: &SyncStore) -> InvariantResult {
        for channel in store.message_channels() {
            let ids = store.ordered_ids(channel);
            if ids.len() != store.message_count(channel) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "channel {channel}: index has {} ids for {} records",
                        ids.len(),
                        store.message_count(channel)
                    ),
                });
            }

            let mut previous = None;
            for id in ids {
                let Some(record) = store.message(channel, id) else {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("channel {channel}: indexed id {id} has no record"),
                    });
                };
                if record.channel_id() != channel {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "channel {channel}: record {id} belongs to {}",
                            record.channel_id()
                        ),
                    });
                }
                let key = (record.created_at(), record.id());
                if previous.is_some_and(|prev| prev >= key) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("channel {channel}: index out of order at {id}"),
                    });
                }
                previous = Some(key);
            }
        }
        Ok(())
    }
}

/// No two records in one channel carry the same nonce.
pub struct UniqueNonces;

impl Invariant for UniqueNonces {
    fn name(&self) -> &'static str {
        "unique_nonces"
    }

    fn check(&self, store: &SyncStore) -> InvariantResult {
        for channel in store.message_channels() {
            let mut seen = HashSet::new();
            for nonce in store.messages(channel).into_iter().filter_map(ClientMessage::nonce) {
                if !seen.insert(nonce) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("channel {channel}: nonce {nonce} appears twice"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Confirmed records never carry a submission error.
pub struct SentHasNoError;

impl Invariant for SentHasNoError {
    fn name(&self) -> &'static str {
        "sent_has_no_error"
    }

    fn check(&self, store: &SyncStore) -> InvariantResult {
        for channel in store.message_channels() {
            let stale = store
                .messages(channel)
                .into_iter()
                .find(|r| r.status == DeliveryStatus::Sent && r.error.is_some());
            if let Some(record) = stale {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("channel {channel}: sent record {} has an error", record.id()),
                });
            }
        }
        Ok(())
    }
}
