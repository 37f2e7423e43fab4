//! Fuzz target for SyncStore mutations
//!
//! # Strategy
//!
//! - Interleaved canonical upserts, optimistic inserts, failures, retries,
//!   patches, deletions and channel removals across a few channels
//! - Small message bounds so eviction runs constantly
//!
//! # Invariants
//!
//! - The standard invariant registry holds after every operation
//! - The resume cursor never decreases

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_harness::InvariantRegistry;
use murmur_proto::{ChannelId, Message, MessageId, MessagePatch, Timestamp};
use murmur_store::{ClientMessage, StoreConfig, SyncStore, UploadState};

#[derive(Debug, Clone, Arbitrary)]
enum StoreOp {
    Canonical { channel: u8, id: u8, at: u16, nonce: Option<u8> },
    Optimistic { channel: u8, nonce: u8, at: u16 },
    Fail { channel: u8, nonce: u8 },
    Retry { channel: u8, nonce: u8 },
    Patch { channel: u8, id: u8 },
    Remove { channel: u8, id: u8 },
    RemoveChannel { channel: u8 },
    Cursor { at: u16 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    bound: u8,
    ops: Vec<StoreOp>,
}

fn channel(n: u8) -> ChannelId {
    ChannelId::new(format!("c{}", n % 4))
}

fn local(nonce: u8) -> MessageId {
    MessageId::new(format!("local-n{nonce}"))
}

fuzz_target!(|input: Input| {
    let registry = InvariantRegistry::standard();
    let bound = usize::from(input.bound % 16) + 1;
    let mut store = SyncStore::new(StoreConfig::with_message_bound(bound));

    for (step, op) in input.ops.iter().enumerate() {
        let now = Timestamp::from_millis(step as i64);
        let cursor_before = store.cursor();

        match *op {
            StoreOp::Canonical { channel: c, id, at, nonce } => {
                let created = Timestamp::from_millis(at.into());
                let mut message = Message::new(format!("m{id}"), channel(c), "a1", "x", created);
                message.nonce = nonce.map(|n| format!("n{n}"));
                store.reconcile_by_nonce(&channel(c), message, now);
            },
            StoreOp::Optimistic { channel: c, nonce, at } => {
                let created = Timestamp::from_millis(at.into());
                let message = Message::new(local(nonce), channel(c), "me", "draft", created)
                    .with_nonce(format!("n{nonce}"));
                let record = ClientMessage::optimistic(message, vec![UploadState::pending(None)]);
                let _ = store.insert_optimistic(&channel(c), record, now);
            },
            StoreOp::Fail { channel: c, nonce } => {
                store.mark_failed(&channel(c), &local(nonce), "offline");
            },
            StoreOp::Retry { channel: c, nonce } => {
                let _ = store.mark_retrying(&channel(c), &local(nonce));
            },
            StoreOp::Patch { channel: c, id } => store.patch_message(&MessagePatch {
                id: MessageId::new(format!("m{id}")),
                channel_id: channel(c),
                content: Some("edited".into()),
                attachments: None,
                embeds: None,
                updated_at: Some(now),
            }),
            StoreOp::Remove { channel: c, id } => {
                store.remove_message(&channel(c), &MessageId::new(format!("m{id}")));
            },
            StoreOp::RemoveChannel { channel: c } => store.remove_channel(&channel(c)),
            StoreOp::Cursor { at } => store.advance_cursor(Timestamp::from_millis(at.into())),
        }

        if let Err(violations) = registry.check_all(&store) {
            panic!("step {step} {op:?}: {violations:?}");
        }
        assert!(store.cursor() >= cursor_before, "cursor moved backwards at step {step}");
    }
});
