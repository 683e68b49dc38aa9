pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

// Router with all routes wired to the shared state
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/public", get(handlers::public_handler))
        .route("/private", get(handlers::private_handler))
        .route(
            "/items",
            post(handlers::create_item_handler).get(handlers::list_items_handler),
        )
        .route("/items/search", get(handlers::search_items_handler))
        .route(
            "/items/{id}",
            get(handlers::get_item_handler)
                .put(handlers::update_item_handler)
                .delete(handlers::delete_item_handler),
        )
        .with_state(state)
}
