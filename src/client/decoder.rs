//! Turns the server's event channel back into [`RelayEvent`]s.
//!
//! Accepts SSE framing (`data: {...}`) and bare JSON lines. Chunks may
//! split anywhere, including inside a UTF-8 sequence.

use std::fmt::Display;

use futures::{Stream, StreamExt};

use crate::relay::RelayEvent;

pub const ENDED_WITHOUT_RESULT: &str = "Stream ended unexpectedly";

/// Decode one line. Blank lines, SSE fields other than `data` and
/// malformed payloads yield `None`.
pub fn decode_line(line: &str) -> Option<RelayEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None if line.starts_with('{') => line,
        None => return None,
    };
    match serde_json::from_str::<RelayEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed event line");
            None
        }
    }
}

/// Incremental line splitter over raw chunks.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: Vec<u8>,
}

impl EventDecoder {
    /// Feed a chunk and return the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RelayEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the input has ended.
    pub fn finish(&mut self) -> Option<RelayEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
    }
}

/// Lazy event sequence over a byte stream. Ends after the first terminal
/// event; a transport error or an early end becomes a single `Error`.
pub fn decode_stream<S, B, E>(body: S) -> impl Stream<Item = RelayEvent>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    async_stream::stream! {
        let mut decoder = EventDecoder::default();
        let mut finished = false;
        futures::pin_mut!(body);

        while !finished {
            let Some(chunk) = body.next().await else { break };
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(bytes.as_ref()) {
                        finished = event.is_terminal();
                        yield event;
                        if finished {
                            break;
                        }
                    }
                }
                Err(e) => {
                    finished = true;
                    yield RelayEvent::Error(e.to_string());
                }
            }
        }

        if !finished {
            match decoder.finish() {
                Some(event) if event.is_terminal() => {
                    yield event;
                }
                Some(event) => {
                    yield event;
                    yield RelayEvent::Error(ENDED_WITHOUT_RESULT.to_string());
                }
                None => {
                    yield RelayEvent::Error(ENDED_WITHOUT_RESULT.to_string());
                }
            }
        }
    }
}
