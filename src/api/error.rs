use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::llm::LlmError;
use crate::ManuscryptError;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// An error rendered as `{"statusCode": n, "message": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub retry_after_secs: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<ManuscryptError> for ApiError {
    fn from(err: ManuscryptError) -> Self {
        match err {
            ManuscryptError::Validation(message) => Self::bad_request(message),
            ManuscryptError::NotFound { entity_type, .. } => Self::new(
                StatusCode::NOT_FOUND,
                format!("{} not found", capitalize(&entity_type)),
            ),
            ManuscryptError::RateLimited { retry_after_secs } => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: RATE_LIMITED_MESSAGE.to_string(),
                retry_after_secs: Some(retry_after_secs),
            },
            ManuscryptError::ProviderUnavailable(message) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ManuscryptError::MalformedResponse { label, message } => {
                tracing::warn!(label = %label, error = %message, "Model reply could not be parsed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to parse {label} response"),
                )
            }
            ManuscryptError::Llm(e) => Self::from(e),
            e @ (ManuscryptError::Database(_) | ManuscryptError::Config(_)) => {
                tracing::error!(error = %e, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        tracing::warn!(error = %err, "Upstream model call failed");
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid input: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid input: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            message: &self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
