use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::rate_limit::{Policy, RateLimiter};

// App's shared state, built once at startup and injected via axum state
pub struct AppState {
    pub db: SqlitePool,
    pub limiter: RateLimiter,
    pub api_keys: HashSet<String>,
    pub public_policy: Policy,
    pub private_policy: Policy,
}
