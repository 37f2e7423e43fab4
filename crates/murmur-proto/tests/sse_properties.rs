//! Property-based tests for SSE decoding.
//!
//! A gateway body may be cut into chunks anywhere. These tests verify that
//! decoding is independent of where the cuts fall, and that envelopes survive
//! the trip through the decoder.

use murmur_proto::{Envelope, EventTag, GatewayEvent, SseDecoder, Timestamp, TypingStarted};
use proptest::prelude::*;

/// Strategy for event data text without newlines.
fn data_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 {}:\",é]{0,40}"
}

/// Render frames as a gateway body.
fn body(frames: &[String]) -> Vec<u8> {
    frames.iter().map(|f| format!("data: {f}\n\n")).collect::<String>().into_bytes()
}

/// Decode `bytes` after cutting them at the given positions.
fn decode_with_cuts(bytes: &[u8], cuts: &[usize]) -> Vec<String> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut decoder = SseDecoder::new();
    let mut out = Vec::new();
    let mut start = 0;
    for cut in cuts {
        out.extend(decoder.feed(&bytes[start..cut]).unwrap());
        start = cut;
    }
    out.extend(decoder.feed(&bytes[start..]).unwrap());
    out
}

proptest! {
    #[test]
    fn prop_chunking_is_invisible(
        frames in prop::collection::vec(data_text(), 0..8),
        cuts in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        let bytes = body(&frames);
        let decoded = decode_with_cuts(&bytes, &cuts);
        prop_assert_eq!(decoded, frames);
    }

    #[test]
    fn prop_typing_events_survive_decoding(
        channel in "[a-z0-9]{1,12}",
        author in "[a-z0-9]{1,12}",
        ts in 0i64..4_000_000_000_000,
        cut in any::<usize>(),
    ) {
        let event = GatewayEvent::TypingStarted(TypingStarted {
            channel_id: channel.as_str().into(),
            author_id: author.as_str().into(),
        });
        let sse = event.clone().into_envelope(Some(Timestamp::from_millis(ts))).to_sse();

        let frames = decode_with_cuts(sse.as_bytes(), &[cut]);
        prop_assert_eq!(frames.len(), 1);

        let envelope = Envelope::parse(&frames[0]).unwrap();
        prop_assert_eq!(envelope.ts, Some(Timestamp::from_millis(ts)));
        prop_assert_eq!(envelope.tag(), Some(EventTag::TypingStarted));
        prop_assert_eq!(envelope.into_event().unwrap(), Some(event));
    }
}

#[test]
fn invalid_json_frame_does_not_poison_following_frames() {
    let mut decoder = SseDecoder::new();
    let frames = decoder.feed(b"data: {not json\n\ndata: {\"t\":\"HEARTBEAT\"}\n\n").unwrap();
    assert_eq!(frames.len(), 2);

    assert!(Envelope::parse(&frames[0]).is_err());
    assert_eq!(
        Envelope::parse(&frames[1]).unwrap().into_event().unwrap(),
        Some(GatewayEvent::Heartbeat)
    );
}
