//! Fuzz target for SseDecoder chunk boundaries
//!
//! # Strategy
//!
//! - Arbitrary body bytes, including invalid UTF-8, lone `\r` and
//!   unterminated frames
//! - Arbitrary split points, including empty chunks
//!
//! # Invariants
//!
//! - Never panics
//! - Chunked and whole-body decoding emit the same frames in the same order

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_proto::SseDecoder;

#[derive(Debug, Arbitrary)]
struct Input {
    body: Vec<u8>,
    splits: Vec<u16>,
}

fuzz_target!(|input: Input| {
    // Inputs stay far below the frame cap, so both sides decode fully
    let whole = SseDecoder::new().feed(&input.body).ok();

    let mut cuts: Vec<usize> =
        input.splits.iter().map(|s| usize::from(*s) % (input.body.len() + 1)).collect();
    cuts.sort_unstable();

    let mut decoder = SseDecoder::new();
    let mut chunked = Some(Vec::new());
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(input.body.len())) {
        match (decoder.feed(&input.body[start..cut]), chunked.as_mut()) {
            (Ok(frames), Some(out)) => out.extend(frames),
            _ => chunked = None,
        }
        start = cut;
    }

    assert_eq!(whole, chunked, "chunking changed the decoded frames");
});
