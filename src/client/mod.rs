//! Consumer side of the assistant endpoints.

pub mod decoder;
pub mod session;

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;

use crate::llm::ChatTurn;
use crate::relay::RelayEvent;

pub use decoder::{decode_line, decode_stream, EventDecoder};
pub use session::{SessionKey, SessionState, SessionStore};

/// Decoded server events, ending after the terminal one.
pub type EventStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the request before streaming.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// A chat turn to send through `/api/ai/stream`.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub book_id: String,
    pub chapter_id: Option<String>,
    pub command: Option<String>,
    pub selected_text: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamBody<'a> {
    book_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    chapter_id: Option<&'a str>,
    messages: &'a [ChatTurn],
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_text: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InterviewBody<'a> {
    book_id: &'a str,
    character_id: &'a str,
    message: &'a str,
    history: &'a [ChatTurn],
}

/// HTTP client for a running manuscrypt server.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    base_url: String,
}

impl AssistantClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// POST `body` and expose the reply as a lazy event sequence.
    pub async fn open_stream<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<EventStream, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(String::from))
                .unwrap_or(text);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(Box::pin(decode_stream(response.bytes_stream())))
    }

    /// Send one chat turn, folding the streamed reply into `session`.
    /// `on_event` sees every event as it arrives.
    pub async fn send(
        &self,
        session: &mut SessionState,
        request: &ChatRequest,
        on_event: impl FnMut(&RelayEvent),
    ) -> Result<(), ClientError> {
        session.begin(request.message.clone());
        let body = StreamBody {
            book_id: &request.book_id,
            chapter_id: request.chapter_id.as_deref(),
            messages: &session.messages,
            command: request.command.as_deref(),
            selected_text: request.selected_text.as_deref(),
        };
        let opened = self.open_stream("/api/ai/stream", &body).await;
        consume(session, opened, on_event).await
    }

    /// Ask a character a question, folding the reply into `session`.
    pub async fn interview(
        &self,
        session: &mut SessionState,
        book_id: &str,
        character_id: &str,
        message: &str,
        on_event: impl FnMut(&RelayEvent),
    ) -> Result<(), ClientError> {
        let history = session.messages.clone();
        session.begin(message);
        let body = InterviewBody {
            book_id,
            character_id,
            message,
            history: &history,
        };
        let opened = self.open_stream("/api/ai/interview", &body).await;
        consume(session, opened, on_event).await
    }
}

async fn consume(
    session: &mut SessionState,
    opened: Result<EventStream, ClientError>,
    mut on_event: impl FnMut(&RelayEvent),
) -> Result<(), ClientError> {
    let mut events = match opened {
        Ok(events) => events,
        Err(e) => {
            session.fail(e.to_string());
            return Err(e);
        }
    };
    while let Some(event) = events.next().await {
        on_event(&event);
        session.apply(&event);
    }
    Ok(())
}
