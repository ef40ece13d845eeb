//! `/api/ai/messages`: the persisted conversation logs.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use surrealdb::RecordId;

use super::ApiError;
use crate::init::AppContext;
use crate::llm::Role;
use crate::models::{record_key, Message, MessageCreate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    #[serde(default)]
    pub book_id: Option<String>,
    #[serde(default)]
    pub character_id: Option<String>,
}

impl LogQuery {
    fn book_id(&self) -> Result<&str, ApiError> {
        self.book_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("bookId is required"))
    }

    fn character_id(&self) -> Option<&str> {
        self.character_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendRequest {
    pub book_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub character_id: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    /// Accepted for client compatibility; the log is keyed by character.
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// A logged message as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub book_id: String,
    pub chapter_id: Option<String>,
    pub character_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub command: Option<String>,
    pub created_at: String,
}

impl From<Message> for MessageView {
    fn from(m: Message) -> Self {
        Self {
            id: record_key(&m.id),
            book_id: record_key(&m.book),
            chapter_id: m.chapter_id,
            character_id: m.character_id,
            role: m.role,
            content: m.content,
            command: m.command,
            created_at: m.created_at.to_string(),
        }
    }
}

/// `GET ?bookId&characterId?`, oldest first.
pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let Query(query) = query?;
    let messages = ctx
        .message_log
        .list(query.book_id()?, query.character_id())
        .await?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}

/// `POST {bookId, role, content, ...}` returns `{id}`.
pub async fn append(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<AppendRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    if req.book_id.trim().is_empty() {
        return Err(ApiError::bad_request("bookId is required"));
    }
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    tracing::debug!(
        book_id = %req.book_id,
        session_type = ?req.session_type,
        session_id = ?req.session_id,
        "Appending message"
    );

    let message = ctx
        .message_log
        .append(MessageCreate {
            book: RecordId::from(("book", req.book_id.as_str())),
            chapter_id: req.chapter_id.filter(|id| !id.is_empty()),
            character_id: req.character_id.filter(|id| !id.is_empty()),
            role: req.role,
            content: req.content,
            command: req.command,
        })
        .await?;
    Ok(Json(json!({ "id": record_key(&message.id) })))
}

/// `DELETE ?bookId&characterId?` clears one log.
pub async fn clear(
    State(ctx): State<Arc<AppContext>>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let book_id = query.book_id()?;
    let removed = ctx
        .message_log
        .clear(book_id, query.character_id())
        .await?;
    tracing::info!(book_id, removed, "Cleared message log");
    Ok(Json(json!({ "success": true })))
}
