//! Incremental `text/event-stream` decoder.
//!
//! The body arrives as arbitrary byte chunks. The decoder buffers partial
//! lines across chunks, collects `data:` lines, and emits the joined data of
//! a frame when it sees the blank line that terminates it.
//!
//! Only `data:` lines matter to the gateway; `event:`, `id:`, `retry:` and
//! comment lines are skipped. Lines are split on `\n` with an optional
//! trailing `\r` removed. Bytes are decoded as UTF-8 per complete line, so a
//! multi-byte character split across chunks is never mangled.
//!
//! The bytes of the frame still being assembled are capped, so a peer that
//! never terminates a line or a frame cannot grow the buffers without bound.

use crate::{ProtocolError, Result};

/// Prefix of a data line.
const DATA_PREFIX: &str = "data:";

/// Default cap on the buffered bytes of one unfinished frame (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1 << 20;

/// Stateful SSE frame splitter.
#[derive(Debug, Clone)]
pub struct SseDecoder {
    /// Bytes after the last newline seen.
    partial: Vec<u8>,
    /// Data lines of the frame being assembled.
    data: Vec<String>,
    /// Total length of `data`.
    data_bytes: usize,
    max_frame_bytes: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that gives up once an unfinished frame buffers more than
    /// `max_frame_bytes`.
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self { partial: Vec::new(), data: Vec::new(), data_bytes: 0, max_frame_bytes }
    }

    /// Feed a chunk of the body and return the data text of every frame it
    /// completes, in order.
    ///
    /// Fails with [`ProtocolError::FrameTooLarge`] when the unfinished frame
    /// outgrows the cap. The decoder is reset and frames completed earlier in
    /// the same chunk are discarded; the connection should be dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        let mut frames = Vec::new();
        let mut buf = std::mem::take(&mut self.partial);
        buf.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(pos) = buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            if let Some(frame) = self.push_line(&buf[start..end]) {
                frames.push(frame);
            }
            start = end + 1;
        }

        buf.drain(..start);
        self.partial = buf;

        let pending = self.data_bytes + self.partial.len();
        if pending > self.max_frame_bytes {
            self.reset();
            return Err(ProtocolError::FrameTooLarge { pending, limit: self.max_frame_bytes });
        }
        Ok(frames)
    }

    /// True if a frame or line is partially assembled.
    ///
    /// A stream that ends while this holds was cut mid-frame.
    pub fn has_pending(&self) -> bool {
        !self.partial.is_empty() || !self.data.is_empty()
    }

    /// Discard any partially assembled frame. Used when a connection drops.
    pub fn reset(&mut self) {
        self.partial.clear();
        self.data.clear();
        self.data_bytes = 0;
    }

    fn push_line(&mut self, line: &[u8]) -> Option<String> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let frame = self.data.join("\n");
            self.data.clear();
            self.data_bytes = 0;
            return Some(frame);
        }

        let text = String::from_utf8_lossy(line);
        if let Some(rest) = text.strip_prefix(DATA_PREFIX) {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            self.data_bytes += rest.len();
            self.data.push(rest.to_owned());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b"data: {\"t\":\"HEARTBEAT\"}\n\n").unwrap();
        assert_eq!(frames, vec![r#"{"t":"HEARTBEAT"}"#.to_owned()]);
        assert!(!dec.has_pending());
    }

    #[test]
    fn multiple_data_lines_join_with_newline() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b"data: {\"t\":\ndata:\"HEARTBEAT\"}\n\n").unwrap();
        assert_eq!(frames, vec!["{\"t\":\n\"HEARTBEAT\"}".to_owned()]);
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: {\"t\":\"HEA").unwrap().is_empty());
        assert!(dec.has_pending());
        assert!(dec.feed(b"RTBEAT\"}\n").unwrap().is_empty());
        assert_eq!(dec.feed(b"\n").unwrap(), vec![r#"{"t":"HEARTBEAT"}"#.to_owned()]);
    }

    #[test]
    fn crlf_line_endings() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b"data: a\r\n\r\ndata: b\r\n\r\n").unwrap();
        assert_eq!(frames, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn non_data_fields_are_skipped() {
        let mut dec = SseDecoder::new();
        let frames = dec.feed(b": keepalive\nevent: message\nid: 7\ndata: x\n\n").unwrap();
        assert_eq!(frames, vec!["x".to_owned()]);
    }

    #[test]
    fn blank_lines_without_data_emit_nothing() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"\n\n\n").unwrap().is_empty());
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let text = "data: héllo\n\n".as_bytes();
        let split = text.iter().position(|&b| b >= 0x80).unwrap() + 1;

        let mut dec = SseDecoder::new();
        assert!(dec.feed(&text[..split]).unwrap().is_empty());
        assert_eq!(dec.feed(&text[split..]).unwrap(), vec!["héllo".to_owned()]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut dec = SseDecoder::new();
        let _ = dec.feed(b"data: half\n").unwrap();
        dec.reset();
        assert!(!dec.has_pending());
        assert_eq!(dec.feed(b"data: whole\n\n").unwrap(), vec!["whole".to_owned()]);
    }

    #[test]
    fn unterminated_line_over_cap_fails_and_resets() {
        let mut dec = SseDecoder::with_max_frame_bytes(16);
        assert!(dec.feed(b"data: 0123456789").unwrap().is_empty());

        let err = dec.feed(b"abcdef").unwrap_err();
        assert_eq!(err, ProtocolError::FrameTooLarge { pending: 22, limit: 16 });
        assert!(!dec.has_pending());
        assert_eq!(dec.feed(b"data: ok\n\n").unwrap(), vec!["ok".to_owned()]);
    }

    #[test]
    fn endless_data_lines_hit_the_cap() {
        let mut dec = SseDecoder::with_max_frame_bytes(16);
        assert!(dec.feed(b"data: 0123456789\n").unwrap().is_empty());
        assert!(dec.feed(b"data: 0123456789\n").is_err());
    }

    #[test]
    fn completed_frames_do_not_count_against_the_cap() {
        let mut dec = SseDecoder::with_max_frame_bytes(16);
        for _ in 0..10 {
            let frames = dec.feed(b"data: 0123456789\n\n").unwrap();
            assert_eq!(frames, vec!["0123456789".to_owned()]);
        }
    }
}
