use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

// Per-request error surface; every variant maps to one terminal response
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API key")]
    InvalidApiKey,

    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("item not found")]
    ItemNotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Invalid API Key" })),
            )
                .into_response(),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(json!({
                    "error": "Rate limit exceeded",
                    "retry_after": retry_after,
                    "message": "Please try again later."
                })),
            )
                .into_response(),
            ApiError::ItemNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Item not found" })),
            )
                .into_response(),
            ApiError::Database(e) => {
                tracing::error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
