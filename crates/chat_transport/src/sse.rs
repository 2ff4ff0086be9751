//! Newline framing for `data: `-prefixed event streams.

/// Sentinel payload that ends a stream before end-of-body.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One framed line of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Payload of a `data: ` line, prefix removed.
    Data(String),
    /// `data: [DONE]` was seen; no further lines are produced.
    Done,
}

/// Incremental line splitter for chunked response bodies.
///
/// Bytes are buffered until a newline arrives, so a line (or a multi-byte
/// character) split across reads is decoded only once complete.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
    done: bool,
}

impl SseLineBuffer {
    /// Feeds one read's bytes and drains every complete line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseLine> {
        if self.done {
            return Vec::new();
        }

        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();

        while let Some(split) = self.pending.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=split).collect();
            if self.push_line(&raw[..split], &mut lines) {
                break;
            }
        }

        lines
    }

    /// Flushes a trailing line that arrived without a terminator at end-of-body.
    pub fn finish(&mut self) -> Vec<SseLine> {
        if self.done || self.pending.is_empty() {
            self.pending.clear();
            return Vec::new();
        }

        let raw = std::mem::take(&mut self.pending);
        let mut lines = Vec::new();
        self.push_line(&raw, &mut lines);
        lines
    }

    /// Returns true once the done sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns true while a partial line is held for the next read.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn push_line(&mut self, raw: &[u8], lines: &mut Vec<SseLine>) -> bool {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim_end_matches('\r');

        let Some(payload) = data_payload(line) else {
            return false;
        };

        if payload.trim() == DONE_SENTINEL {
            self.done = true;
            self.pending.clear();
            lines.push(SseLine::Done);
            return true;
        }

        lines.push(SseLine::Data(payload.to_owned()));
        false
    }
}

/// Only the exact `data: ` prefix counts; any other line is skipped.
fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data: ")
}
