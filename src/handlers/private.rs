use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::rate_limit::Decision;
use crate::state::AppState;

pub async fn private_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let api_key = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !state.api_keys.contains(api_key) {
        return Err(ApiError::InvalidApiKey);
    }

    let decision = state.limiter.check(&state.private_policy, api_key).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match decision {
        Decision::Allowed {
            remaining,
            reset_after_secs,
        } => Ok((
            super::rate_limit_headers(remaining, reset_after_secs),
            Json(serde_json::json!({
                "message": format!("Private route for API key {api_key}")
            })),
        )),
        Decision::Denied { retry_after_secs } => Err(ApiError::RateLimited {
            retry_after: retry_after_secs,
        }),
    }
}
