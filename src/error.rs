use thiserror::Error;

use crate::llm::LlmError;

/// Custom error type for Manuscrypt operations.
#[derive(Debug, Error)]
pub enum ManuscryptError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Requested entity was not found.
    #[error("Not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },

    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Admission control rejected the request.
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// No upstream model provider is configured.
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The upstream model could not be reached or failed mid-call.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model replied, but the reply could not be used.
    #[error("Failed to parse {label} response: {message}")]
    MalformedResponse { label: String, message: String },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ManuscryptError {
    pub fn not_found(entity_type: &str, id: &str) -> Self {
        ManuscryptError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<surrealdb::Error> for ManuscryptError {
    fn from(err: surrealdb::Error) -> Self {
        ManuscryptError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ManuscryptError {
    fn from(err: serde_json::Error) -> Self {
        ManuscryptError::Database(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for ManuscryptError {
    fn from(err: std::io::Error) -> Self {
        ManuscryptError::Database(format!("I/O error: {}", err))
    }
}
