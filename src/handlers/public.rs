use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::rate_limit::Decision;
use crate::state::AppState;

// Client identity for the public policy - proxy header first, then socket address
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

pub async fn public_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let identity = client_ip(&headers, addr);
    let decision = state.limiter.check(&state.public_policy, &identity).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match decision {
        Decision::Allowed {
            remaining,
            reset_after_secs,
        } => Ok((
            super::rate_limit_headers(remaining, reset_after_secs),
            Json(serde_json::json!({
                "message": format!(
                    "Public endpoint - {} requests per {} seconds allowed",
                    state.public_policy.limit, state.public_policy.window_secs
                )
            })),
        )),
        Decision::Denied { retry_after_secs } => Err(ApiError::RateLimited {
            retry_after: retry_after_secs,
        }),
    }
}
