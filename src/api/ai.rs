//! Assistant endpoints: streamed chat and interviews, single-shot analysis.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::info;

use super::{ApiError, ClientAddr};
use crate::init::AppContext;
use crate::llm::{ChatTurn, CompletionRequest, ModelTier, Role};
use crate::models::{chapter, character, record_key};
use crate::relay::{spawn_relay, ExchangeRecord, Persistence, RelayHandle};
use crate::services::analysis::{self, ChapterReview, StyleAnalysis};
use crate::services::{interview_prompt, Command};
use crate::ManuscryptError;

pub const STREAM_MAX_TOKENS: u32 = 4096;
pub const INTERVIEW_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub book_id: String,
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub selected_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRequest {
    pub book_id: String,
    pub character_id: String,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub chapter_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRequest {
    pub text: String,
    #[serde(default)]
    pub book_id: Option<String>,
}

fn admit(ctx: &AppContext, scope: &str, client: &ClientAddr) -> Result<(), ApiError> {
    ctx.rate_limiter
        .check(scope, &client.0, ctx.config.rate_limit.policy_for(scope))
        .map_err(|e| {
            tracing::warn!(scope, client = %client.0, "Rate limit exceeded");
            ApiError::from(e)
        })
}

fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn event_stream(handle: RelayHandle) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = ReceiverStream::new(handle.events)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// `POST /api/ai/stream`
pub async fn stream(
    State(ctx): State<Arc<AppContext>>,
    client: ClientAddr,
    payload: Result<Json<StreamRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    admit(&ctx, "stream", &client)?;
    let Json(req) = payload?;
    required(&req.book_id, "bookId")?;
    if req.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }
    let provider = ctx.provider()?;

    let chapter_id = non_empty(req.chapter_id);
    let selected_text = non_empty(req.selected_text);
    let command = Command::parse(req.command.as_deref());

    let book_context = ctx
        .assembler
        .build(&req.book_id, chapter_id.as_deref())
        .await?;
    let system = ctx
        .compiler
        .compile(&book_context, command, selected_text.as_deref());

    let model = ctx.model(ModelTier::Fast);
    info!(
        book_id = %req.book_id,
        chapter_id = ?chapter_id,
        command = command.as_str(),
        model = %model,
        client = %client.0,
        "Streaming assistant reply"
    );

    let user_message = req
        .messages
        .iter()
        .rev()
        .find(|turn| turn.role == Role::User)
        .map(|turn| turn.content.clone());
    let persistence = Persistence {
        log: ctx.message_log.clone(),
        record: ExchangeRecord {
            book_id: req.book_id,
            chapter_id,
            character_id: None,
            command: Some(command.as_str().to_string()),
            user_message,
        },
    };

    let request = CompletionRequest {
        model,
        system,
        messages: req.messages,
        max_tokens: STREAM_MAX_TOKENS,
    };
    Ok(event_stream(spawn_relay(provider, request, Some(persistence))))
}

/// `POST /api/ai/interview`
pub async fn interview(
    State(ctx): State<Arc<AppContext>>,
    client: ClientAddr,
    payload: Result<Json<InterviewRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    admit(&ctx, "interview", &client)?;
    let Json(req) = payload?;
    required(&req.book_id, "bookId")?;
    required(&req.character_id, "characterId")?;
    required(&req.message, "message")?;
    let provider = ctx.provider()?;

    let found = character::get_character(&ctx.db, &req.character_id)
        .await?
        .filter(|c| record_key(&c.book) == req.book_id)
        .ok_or_else(|| ManuscryptError::not_found("character", &req.character_id))?;

    let model = ctx.model(ModelTier::Smart);
    info!(
        book_id = %req.book_id,
        character_id = %req.character_id,
        model = %model,
        client = %client.0,
        "Streaming interview reply"
    );

    let mut messages = req.history;
    messages.push(ChatTurn::user(req.message.clone()));

    let persistence = Persistence {
        log: ctx.message_log.clone(),
        record: ExchangeRecord {
            book_id: req.book_id,
            chapter_id: None,
            character_id: Some(req.character_id),
            command: None,
            user_message: Some(req.message),
        },
    };

    let request = CompletionRequest {
        model,
        system: interview_prompt(&found),
        messages,
        max_tokens: INTERVIEW_MAX_TOKENS,
    };
    Ok(event_stream(spawn_relay(provider, request, Some(persistence))))
}

/// `POST /api/ai/review`
pub async fn review(
    State(ctx): State<Arc<AppContext>>,
    client: ClientAddr,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<ChapterReview>, ApiError> {
    admit(&ctx, "review", &client)?;
    let Json(req) = payload?;
    required(&req.chapter_id, "chapterId")?;

    let found = chapter::get_chapter(&ctx.db, &req.chapter_id)
        .await?
        .ok_or_else(|| ManuscryptError::not_found("chapter", &req.chapter_id))?;
    let provider = ctx.provider()?;

    let model = ctx.model(ModelTier::Smart);
    info!(chapter_id = %req.chapter_id, model = %model, "Reviewing chapter");
    let review = analysis::review_chapter(provider.as_ref(), &model, &found).await?;
    Ok(Json(review))
}

/// `POST /api/ai/style-analyze`
pub async fn style_analyze(
    State(ctx): State<Arc<AppContext>>,
    client: ClientAddr,
    payload: Result<Json<StyleRequest>, JsonRejection>,
) -> Result<Json<StyleAnalysis>, ApiError> {
    admit(&ctx, "style-analyze", &client)?;
    let Json(req) = payload?;
    analysis::validate_style_text(&req.text)?;
    let provider = ctx.provider()?;

    let model = ctx.model(ModelTier::Smart);
    info!(book_id = ?req.book_id, model = %model, "Analyzing style");
    let result = analysis::analyze_style(provider.as_ref(), &model, &req.text).await?;
    Ok(Json(result))
}
