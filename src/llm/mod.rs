//! Upstream language-model providers.
//!
//! The [`LlmProvider`] trait accepts a model id, a system prompt, an ordered
//! message list and a token budget, and answers either with one full text
//! or with a sequence of text fragments pushed onto an mpsc channel.

pub mod anthropic;
pub mod scripted;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::ManuscryptError;

pub use anthropic::AnthropicProvider;
pub use scripted::{ScriptedProvider, Step};

/// Errors from talking to the upstream model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Streaming error: {message}")]
    Streaming { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    /// The receiving side of a stream went away before completion.
    #[error("Stream cancelled by consumer")]
    Cancelled,
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: u32,
}

/// Model tier. Interviews, reviews and analysis use `Smart`; chat and
/// continuation use `Fast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Smart,
}

/// Resolved model names per tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNames {
    pub fast: String,
    pub smart: String,
}

impl ModelNames {
    pub fn resolve(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Smart => &self.smart,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Await the whole reply and return its first text block.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Push text fragments onto `tx` in upstream order. Returns `Ok(())` on
    /// clean completion.
    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError>;
}

/// Single-shot call whose reply must be a JSON object.
///
/// Transport failures come back as [`ManuscryptError::Llm`]; a reply that
/// does not parse comes back as [`ManuscryptError::MalformedResponse`]
/// carrying `label`.
pub async fn complete_json<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
    label: &str,
) -> Result<T, ManuscryptError> {
    let text = provider.complete(request).await?;
    let body = strip_code_fence(&text);
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(label, error = %e, "Model reply was not valid JSON");
        ManuscryptError::MalformedResponse {
            label: label.to_string(),
            message: e.to_string(),
        }
    })
}

/// Remove one surrounding Markdown code fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    match inner.find('\n') {
        Some(pos) => inner[pos + 1..].trim(),
        None => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Score {
        score: u8,
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "smart".into(),
            system: "Return JSON".into(),
            messages: vec![ChatTurn::user("hi")],
            max_tokens: 16,
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}"), "```{\"a\":1}");
    }

    #[test]
    fn test_model_names_resolve() {
        let names = ModelNames {
            fast: "haiku".into(),
            smart: "sonnet".into(),
        };
        assert_eq!(names.resolve(ModelTier::Fast), "haiku");
        assert_eq!(names.resolve(ModelTier::Smart), "sonnet");
    }

    #[tokio::test]
    async fn test_complete_json_parses_fenced_reply() {
        let provider = ScriptedProvider::replying("```json\n{\"score\": 7}\n```");
        let parsed: Score = complete_json(&provider, request(), "review").await.unwrap();
        assert_eq!(parsed.score, 7);
    }

    #[tokio::test]
    async fn test_complete_json_distinguishes_malformed_from_transport() {
        let provider = ScriptedProvider::replying("I think it is a 7.");
        let err = complete_json::<Score>(&provider, request(), "review")
            .await
            .unwrap_err();
        match err {
            ManuscryptError::MalformedResponse { label, .. } => assert_eq!(label, "review"),
            other => panic!("expected malformed response, got {other:?}"),
        }

        let provider = ScriptedProvider::new(vec![Step::Fail("overloaded".into())]);
        let err = complete_json::<Score>(&provider, request(), "review")
            .await
            .unwrap_err();
        assert!(matches!(err, ManuscryptError::Llm(_)));
    }
}
