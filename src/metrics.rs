use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "gateway_rate_limited_total",
        "Total requests denied by a rate limit policy"
    )
    .unwrap();
    pub static ref STORE_ERRORS_TOTAL: Counter = register_counter!(
        "gateway_store_errors_total",
        "Total counter store failures resolved by the fail policy"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref ACTIVE_WINDOWS: Gauge = register_gauge!(
        "gateway_active_windows",
        "Current number of tracked rate limit windows"
    )
    .unwrap();
}
