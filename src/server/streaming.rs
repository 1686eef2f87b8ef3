//! Stream translation: Ollama NDJSON to plain-text chunks.
//!
//! Ollama emits one JSON object per line while generating:
//!
//! ```text
//! {"model":"llama3.2","message":{"role":"assistant","content":"Hello"},"done":false}
//! {"model":"llama3.2","message":{"role":"assistant","content":" world"},"done":false}
//! {"model":"llama3.2","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}
//! ```
//!
//! [`relay_chat_stream`] turns that into a lazy, single-pass, finite sequence
//! of plain-text byte chunks: one chunk per non-empty `message.content`
//! fragment, ending on the `done` marker. Once streaming starts the response
//! status and headers are committed, so failures surface as a single in-band
//! `[ERROR] ...` line instead of an out-of-band HTTP error.

use std::convert::Infallible;

use bytes::Bytes;
use futures::stream::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::upstream::{ChatPayload, OllamaClient, UpstreamError};

/// One parsed line of the upstream chat stream.
#[derive(Debug, Default, Deserialize)]
pub struct ChatStreamEvent {
    #[serde(default)]
    pub message: Option<EventMessage>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatStreamEvent {
    /// The non-empty text fragment carried by this event, if any.
    ///
    /// Empty fragments are suppressed so the client never sees a zero-length
    /// chunk; the final `done` event usually carries empty content.
    pub fn fragment(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// Parse one NDJSON line. Malformed lines are dropped, not forwarded.
pub fn parse_event(line: &str) -> Option<ChatStreamEvent> {
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "dropping malformed upstream line");
            None
        }
    }
}

/// Render an upstream failure as a single in-band diagnostic chunk.
pub fn diagnostic_line(err: &UpstreamError) -> String {
    match err {
        UpstreamError::Status { status, body } => {
            format!("[ERROR] HTTP {} from Ollama: {body}\n", status.as_u16())
        }
        UpstreamError::Transport(e) => format!("[ERROR] request to Ollama failed: {e}\n"),
    }
}

/// Relay one streaming chat call as plain-text chunks.
///
/// The sequence is finite and non-restartable: it ends when the upstream
/// signals `done`, when its body ends, or after one diagnostic chunk on
/// failure. The upstream response handle is owned by the generator, so it is
/// released on every exit path, including early drop when the client
/// disconnects.
pub fn relay_chat_stream(
    client: OllamaClient,
    payload: ChatPayload,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        let response = match client.chat_stream(payload).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "streaming chat setup failed");
                yield Ok(Bytes::from(diagnostic_line(&e)));
                return;
            }
        };

        let mut body = std::pin::pin!(response.bytes_stream());
        let mut line_buf = String::new();

        while let Some(next) = body.next().await {
            let chunk = match next {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "upstream stream interrupted");
                    yield Ok(Bytes::from(diagnostic_line(&UpstreamError::Transport(e))));
                    return;
                }
            };

            let text = match std::str::from_utf8(&chunk) {
                Ok(text) => text,
                Err(e) => {
                    yield Ok(Bytes::from(format!("[ERROR] server exception: {e}\n")));
                    return;
                }
            };

            // A network chunk may carry several lines or end mid-line; buffer
            // until a newline completes the event.
            line_buf.push_str(text);

            while let Some(newline) = line_buf.find('\n') {
                let line = line_buf[..newline].trim_end_matches('\r').to_string();
                line_buf.drain(..=newline);

                if line.trim().is_empty() {
                    continue;
                }
                let Some(event) = parse_event(&line) else {
                    continue;
                };
                if let Some(fragment) = event.fragment() {
                    yield Ok(Bytes::copy_from_slice(fragment.as_bytes()));
                }
                if event.done {
                    debug!("upstream signaled completion");
                    return;
                }
            }
        }

        // Trailing line without a newline terminator.
        let remaining = line_buf.trim().to_string();
        if !remaining.is_empty() {
            if let Some(event) = parse_event(&remaining) {
                if let Some(fragment) = event.fragment() {
                    yield Ok(Bytes::copy_from_slice(fragment.as_bytes()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_fragment() {
        let event = parse_event(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hello"},"done":false}"#,
        )
        .unwrap();
        assert_eq!(event.fragment(), Some("Hello"));
        assert!(!event.done);
    }

    #[test]
    fn empty_content_is_suppressed() {
        let event = parse_event(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":""},"done":false}"#,
        )
        .unwrap();
        assert_eq!(event.fragment(), None);
    }

    #[test]
    fn done_marker_detected() {
        let event = parse_event(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#,
        )
        .unwrap();
        assert!(event.done);
        assert_eq!(event.fragment(), None);
    }

    #[test]
    fn done_event_may_still_carry_content() {
        let event = parse_event(r#"{"message":{"content":"tail"},"done":true}"#).unwrap();
        assert_eq!(event.fragment(), Some("tail"));
        assert!(event.done);
    }

    #[test]
    fn missing_message_tolerated() {
        let event = parse_event(r#"{"done":false}"#).unwrap();
        assert_eq!(event.fragment(), None);
        assert!(!event.done);
    }

    #[test]
    fn malformed_line_is_dropped() {
        assert!(parse_event("not valid json").is_none());
    }

    #[test]
    fn status_diagnostic_mentions_code_and_body() {
        let err = UpstreamError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "model exploded".to_string(),
        };
        let line = diagnostic_line(&err);
        assert!(line.starts_with("[ERROR] HTTP 500 from Ollama:"));
        assert!(line.contains("model exploded"));
        assert!(line.ends_with('\n'));
    }
}
