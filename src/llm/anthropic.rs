//! Anthropic Messages API provider.
//!
//! - Auth via `x-api-key` header
//! - Required `anthropic-version` header
//! - Streaming responses arrive as SSE `event:`/`data:` line pairs; only
//!   `content_block_delta` events with a `text_delta` carry prose.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{CompletionRequest, LlmError, LlmProvider};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_request_body(request: &CompletionRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": messages,
        });
        if stream {
            body["stream"] = Value::Bool(true);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection {
                        message: e.to_string(),
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request to Anthropic API failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }
        Ok(response)
    }

    /// Map an HTTP status code to the appropriate `LlmError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: "Anthropic".to_string(),
            },
            429 => LlmError::RateLimited {
                retry_after_secs: 30,
            },
            _ => {
                let detail = serde_json::from_str::<Value>(body_text)
                    .ok()
                    .and_then(|v| v["error"]["message"].as_str().map(String::from))
                    .unwrap_or_else(|| body_text.to_string());
                LlmError::ApiRequest {
                    message: format!("HTTP {} from Anthropic API: {}", status, detail),
                }
            }
        }
    }

    /// First text block of a non-streaming response.
    fn first_text_block(body: &Value) -> Result<String, LlmError> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'content' array in response".to_string(),
            })?;
        Ok(blocks
            .iter()
            .find(|b| b["type"] == "text")
            .and_then(|b| b["text"].as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Interpret one SSE event. Returns the text fragment it carries, if any.
    ///
    /// The event name comes from the preceding `event:` line, falling back to
    /// the `type` field of the data payload.
    fn process_sse_event(event_type: &str, data: &str) -> Result<Option<String>, LlmError> {
        let json: Value = serde_json::from_str(data).map_err(|e| LlmError::Streaming {
            message: format!("Malformed stream event: {}", e),
        })?;
        let event_type = if event_type.is_empty() {
            json["type"].as_str().unwrap_or_default()
        } else {
            event_type
        };

        match event_type {
            "content_block_delta" => {
                let delta = &json["delta"];
                if delta["type"] == "text_delta" {
                    let text = delta["text"].as_str().unwrap_or_default();
                    if !text.is_empty() {
                        return Ok(Some(text.to_string()));
                    }
                }
                Ok(None)
            }
            "error" => Err(LlmError::Streaming {
                message: json["error"]["message"]
                    .as_str()
                    .unwrap_or("Unknown streaming error")
                    .to_string(),
            }),
            other => {
                debug!(event_type = other, "Ignoring SSE event");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        debug!(model = request.model.as_str(), "Sending Anthropic completion request");
        let body = Self::build_request_body(&request, false);
        let response = self.send(&body).await?;
        let json: Value = response.json().await.map_err(|e| LlmError::ResponseParse {
            message: format!("Failed to read response body: {}", e),
        })?;
        Self::first_text_block(&json)
    }

    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError> {
        debug!(model = request.model.as_str(), "Sending Anthropic streaming request");
        let body = Self::build_request_body(&request, true);
        let response = self.send(&body).await?;

        let mut byte_stream = response.bytes_stream();
        // Bytes, not text: a multi-byte character may straddle two chunks.
        let mut line_buffer: Vec<u8> = Vec::new();
        let mut event_type = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Streaming {
                message: format!("Failed to read streaming chunk: {}", e),
            })?;
            line_buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = line_buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = line_buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();

                if line.is_empty() {
                    continue;
                }
                if let Some(name) = line.strip_prefix("event:") {
                    event_type = name.trim().to_string();
                    continue;
                }
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };

                let fragment = Self::process_sse_event(&event_type, data.trim()).inspect_err(
                    |e| warn!(error = %e, "Error processing Anthropic stream event"),
                )?;
                event_type.clear();

                if let Some(text) = fragment {
                    if tx.send(text).await.is_err() {
                        return Err(LlmError::Cancelled);
                    }
                }
            }
        }

        Ok(())
    }
}
