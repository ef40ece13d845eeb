use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiError;
use crate::init::AppContext;
use crate::models::book;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// `GET /api/health`: probes storage before answering.
pub async fn health(State(ctx): State<Arc<AppContext>>) -> Result<Json<HealthResponse>, ApiError> {
    match book::count_books(&ctx.db).await {
        Ok(_) => Ok(Json(HealthResponse {
            status: "ok",
            timestamp: chrono::Utc::now().to_rfc3339(),
        })),
        Err(e) => {
            tracing::error!(error = %e, "Health probe failed");
            Err(ApiError::unavailable("Database unavailable"))
        }
    }
}
