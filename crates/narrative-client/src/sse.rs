//! Incremental decoder for the Anthropic Messages event stream.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A text delta to forward to the reader
    Text(String),
    /// Upstream reported an error mid-stream
    Error(String),
    /// `message_stop` or `[DONE]`; nothing after this is read
    Done,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(rename = "type")]
    kind: String,
    delta: Option<StreamDelta>,
    error: Option<serde_json::Value>,
}

/// Splits arbitrary byte chunks into lines and turns `event:` / `data:` pairs
/// into [`SseEvent`]s. Lines may be split anywhere, including inside a UTF-8
/// sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    pending_event: Option<String>,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one chunk; returns the events completed by it
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.finished {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line, &mut events);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Flush a trailing line that was never newline-terminated
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.finished && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut events);
        }
        self.finished = true;
        events
    }

    fn decode_line(&mut self, raw: &[u8], events: &mut Vec<SseEvent>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if let Some(event) = line.strip_prefix("event:") {
            self.pending_event = Some(event.trim().to_string());
            return;
        }

        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            self.finished = true;
            events.push(SseEvent::Done);
            return;
        }

        let payload: StreamPayload = match serde_json::from_str(data) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable stream chunk");
                return;
            }
        };

        let event_type = self.pending_event.take().unwrap_or_else(|| payload.kind.clone());
        if event_type == "message_stop" || payload.kind == "message_stop" {
            self.finished = true;
            events.push(SseEvent::Done);
            return;
        }

        if event_type == "error" {
            let detail = payload
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "upstream stream error".to_string());
            tracing::error!(detail = %detail, "Narrative stream error event");
            self.finished = true;
            events.push(SseEvent::Error(detail));
            return;
        }

        if payload.kind == "content_block_delta" {
            if let Some(StreamDelta {
                kind: Some(kind),
                text: Some(text),
            }) = payload.delta
            {
                if kind == "text_delta" && !text.is_empty() {
                    events.push(SseEvent::Text(text));
                }
            }
        }
    }
}
