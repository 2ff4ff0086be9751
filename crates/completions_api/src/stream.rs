use chat_transport::{SseLine, SseLineBuffer};

use crate::payload::StreamChunk;

/// One decoded stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    Delta(String),
    Done,
}

/// Turns raw body bytes into content deltas.
///
/// Malformed events are logged and skipped; events without content produce
/// nothing.
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    lines: SseLineBuffer,
}

impl DeltaDecoder {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodedEvent> {
        let lines = self.lines.feed(bytes);
        decode_lines(lines)
    }

    pub fn finish(&mut self) -> Vec<DecodedEvent> {
        let lines = self.lines.finish();
        decode_lines(lines)
    }

    pub fn is_done(&self) -> bool {
        self.lines.is_done()
    }

    /// Decodes a complete body in one shot.
    pub fn decode_all(body: &str) -> Vec<DecodedEvent> {
        let mut decoder = Self::default();
        let mut events = decoder.feed(body.as_bytes());
        events.extend(decoder.finish());
        events
    }
}

fn decode_lines(lines: Vec<SseLine>) -> Vec<DecodedEvent> {
    lines
        .into_iter()
        .filter_map(|line| match line {
            SseLine::Done => Some(DecodedEvent::Done),
            SseLine::Data(payload) => decode_payload(&payload).map(DecodedEvent::Delta),
        })
        .collect()
}

fn decode_payload(payload: &str) -> Option<String> {
    if payload.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty()),
        Err(error) => {
            tracing::warn!(%error, payload, "skipping malformed stream event");
            None
        }
    }
}
