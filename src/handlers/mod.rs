mod health;
mod items;
mod metrics;
mod private;
mod public;

pub use health::health_handler;
pub use items::{
    create_item_handler, delete_item_handler, get_item_handler, list_items_handler,
    search_items_handler, update_item_handler,
};
pub use metrics::metrics_handler;
pub use private::private_handler;
pub use public::public_handler;

use axum::http::HeaderName;

// Quota headers attached to allowed responses on the gated routes
pub(crate) fn rate_limit_headers(remaining: u32, reset_after_secs: u64) -> [(HeaderName, String); 2] {
    [
        (
            HeaderName::from_static("x-ratelimit-remaining"),
            remaining.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-reset"),
            reset_after_secs.to_string(),
        ),
    ]
}
