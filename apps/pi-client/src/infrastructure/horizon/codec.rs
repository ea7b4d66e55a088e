//! Event Stream Codec
//!
//! Incremental decoder for `text/event-stream` bodies as served by the ledger
//! API, plus the mapping from a decoded event to a record payload.
//!
//! # Frame Format
//!
//! ```text
//! retry: 1000
//! event: open
//! data: "hello"
//!
//! id: 12884905984
//! data: {"id":"12884905984","type":"payment",...}
//!
//! ```
//!
//! The `"hello"` and `"byebye"` payloads are control frames sent when the
//! server opens and closes a feed; they never carry a record.

use serde_json::Value;

/// Control payloads the ledger API sends around records.
const CONTROL_FRAMES: [&str; 2] = ["hello", "byebye"];

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Event data is not JSON.
    #[error("event data is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Event data is JSON but not a record object.
    #[error("invalid event payload: {0}")]
    InvalidFormat(String),
}

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// `id:` field, when the event carried one.
    pub id: Option<String>,
    /// `event:` field, when the event carried one.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
    /// `retry:` hint in milliseconds.
    pub retry: Option<u64>,
}

/// Incremental `text/event-stream` decoder.
///
/// Bytes may be split anywhere across chunks; events are returned once their
/// terminating blank line arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    pending: SseEvent,
    has_data: bool,
}

impl SseDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(event) = self.process_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.pending.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.pending.id = Some(value.to_string()),
            "retry" => self.pending.retry = value.parse().ok(),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.pending);
        let has_data = std::mem::replace(&mut self.has_data, false);
        (has_data || event.id.is_some() || event.retry.is_some()).then_some(event)
    }
}

/// Map event data to a record payload.
///
/// Returns `Ok(None)` for control frames and events without data.
///
/// # Errors
///
/// Returns an error if the data is not a JSON object.
pub fn decode_record(event: &SseEvent) -> Result<Option<Value>, CodecError> {
    let data = event.data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(data)? {
        Value::String(frame) if CONTROL_FRAMES.contains(&frame.as_str()) => Ok(None),
        record @ Value::Object(_) => Ok(Some(record)),
        other => Err(CodecError::InvalidFormat(format!(
            "expected a record object, got: {}",
            truncate(&other.to_string(), 50)
        ))),
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_complete_event() {
        let mut decoder = SseDecoder::new();

        let events = decoder.push(b"id: 42\ndata: {\"id\":\"42\"}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("42"));
        assert_eq!(events[0].data, "{\"id\":\"42\"}");
    }

    #[test]
    fn event_split_across_chunks() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.push(b"id: 7\r\nda").is_empty());
        assert!(decoder.push(b"ta: {\"a\":").is_empty());
        let events = decoder.push(b"1}\r\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut decoder = SseDecoder::new();

        let events = decoder.push(b"data: first\ndata: second\n\n");

        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn comments_and_blank_runs_are_ignored() {
        let mut decoder = SseDecoder::new();

        let events = decoder.push(b": keep-alive\n\n\n");

        assert!(events.is_empty());
    }

    #[test]
    fn retry_hint_is_parsed() {
        let mut decoder = SseDecoder::new();

        let events = decoder.push(b"retry: 1000\nevent: open\ndata: \"hello\"\n\n");

        assert_eq!(events[0].retry, Some(1000));
        assert_eq!(events[0].event.as_deref(), Some("open"));
    }

    #[test]
    fn control_frames_carry_no_record() {
        for frame in ["\"hello\"", "\"byebye\""] {
            let event = SseEvent {
                data: frame.to_string(),
                ..SseEvent::default()
            };
            assert!(decode_record(&event).unwrap().is_none());
        }
    }

    #[test]
    fn record_payload_is_returned() {
        let event = SseEvent {
            data: "{\"id\":\"1\",\"type\":\"payment\"}".to_string(),
            ..SseEvent::default()
        };

        let record = decode_record(&event).unwrap().unwrap();

        assert_eq!(record, json!({"id": "1", "type": "payment"}));
    }

    #[test]
    fn non_object_payload_is_an_error() {
        let event = SseEvent {
            data: "[1, 2]".to_string(),
            ..SseEvent::default()
        };
        assert!(matches!(
            decode_record(&event),
            Err(CodecError::InvalidFormat(_))
        ));

        let garbage = SseEvent {
            data: "not json".to_string(),
            ..SseEvent::default()
        };
        assert!(matches!(decode_record(&garbage), Err(CodecError::Json(_))));
    }
}
