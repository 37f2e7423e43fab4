//! Fuzz target for Envelope::parse and Envelope::into_event
//!
//! # Invariants
//!
//! - Never panics; malformed input is a structured error
//! - A decoded event re-encodes to an envelope that decodes to the same
//!   event

#![no_main]

use libfuzzer_sys::fuzz_target;
use murmur_proto::Envelope;

fuzz_target!(|data: &str| {
    let Ok(envelope) = Envelope::parse(data) else {
        return;
    };
    let ts = envelope.ts;
    let Ok(Some(event)) = envelope.into_event() else {
        return;
    };

    let again = event.clone().into_envelope(ts);
    let reparsed = Envelope::parse(again.to_sse().trim_start_matches("data: ").trim_end())
        .expect("re-encoded envelope must parse");
    assert_eq!(reparsed.ts, ts);
    assert_eq!(reparsed.into_event().expect("re-encoded payload must decode"), Some(event));
});
