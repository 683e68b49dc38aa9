//! Router-level tests for the HTTP surface.

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use items_gateway::app;
use items_gateway::db;
use items_gateway::rate_limit::{FailPolicy, MemoryCounterStore, Policy, RateLimiter};
use items_gateway::state::AppState;

// Single connection so the in-memory database survives across requests
async fn test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    db::run_migration(&pool).await.unwrap();
    pool
}

async fn test_app(public: Policy, private: Policy) -> Router {
    let limiter = RateLimiter::new(
        Arc::new(MemoryCounterStore::new()),
        FailPolicy::Closed,
        Duration::from_secs(1),
    );
    let state = Arc::new(AppState {
        db: test_db().await,
        limiter,
        api_keys: HashSet::from(["key123".to_string(), "key456".to_string()]),
        public_policy: public,
        private_policy: private,
    });
    app(state).layer(MockConnectInfo(SocketAddr::from(([1, 2, 3, 4], 8080))))
}

async fn default_app() -> Router {
    test_app(Policy::new("public", 10, 60), Policy::new("private", 5, 60)).await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_key(uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", key)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn public_allows_ten_then_denies_with_retry_after() {
    let app = default_app().await;

    for i in 0..10 {
        let response = app.clone().oneshot(get("/public")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let response = app.clone().oneshot(get("/public")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    let body = body_json(response).await;
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["message"], "Please try again later.");
    let retry_after = body["retry_after"].as_u64().unwrap();
    assert!((55..=60).contains(&retry_after), "retry_after was {retry_after}");
}

#[tokio::test]
async fn public_responses_carry_quota_headers() {
    let app = default_app().await;

    let response = app.clone().oneshot(get("/public")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
    assert_eq!(response.headers()["x-ratelimit-reset"], "60");

    let response = app.clone().oneshot(get("/public")).await.unwrap();
    assert_eq!(response.headers()["x-ratelimit-remaining"], "8");
}

#[tokio::test]
async fn public_identities_tracked_separately() {
    let app = default_app().await;

    // Exhaust the forwarded identity
    for _ in 0..10 {
        let request = Request::builder()
            .uri("/public")
            .header("x-forwarded-for", "9.9.9.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            app.clone().oneshot(request).await.unwrap().status(),
            StatusCode::OK
        );
    }
    let request = Request::builder()
        .uri("/public")
        .header("x-forwarded-for", "9.9.9.9")
        .body(Body::empty())
        .unwrap();
    assert_eq!(
        app.clone().oneshot(request).await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // The socket identity still has its full quota
    let response = app.clone().oneshot(get("/public")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn private_rejects_unknown_key() {
    let app = default_app().await;

    let response = app
        .clone()
        .oneshot(get_with_key("/private", "key999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Invalid API Key");
}

#[tokio::test]
async fn private_rejects_missing_key() {
    let app = default_app().await;

    let response = app.clone().oneshot(get("/private")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Invalid API Key");
}

#[tokio::test]
async fn private_allows_five_then_denies() {
    let app = default_app().await;

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(get_with_key("/private", "key123"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("key123"));
    }

    let response = app
        .clone()
        .oneshot(get_with_key("/private", "key123"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn private_quotas_are_per_key() {
    let app = default_app().await;

    for _ in 0..5 {
        app.clone()
            .oneshot(get_with_key("/private", "key123"))
            .await
            .unwrap();
    }
    assert_eq!(
        app.clone()
            .oneshot(get_with_key("/private", "key123"))
            .await
            .unwrap()
            .status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    let response = app
        .clone()
        .oneshot(get_with_key("/private", "key456"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn items_crud_flow() {
    let app = default_app().await;

    // Create
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/items",
            serde_json::json!({ "name": "widget", "description": "a blue widget" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "widget");

    // Read
    let response = app
        .clone()
        .oneshot(get(&format!("/items/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["description"], "a blue widget");

    // Update
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/items/{id}"),
            serde_json::json!({ "name": "gadget" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["name"], "gadget");
    assert_eq!(updated["description"], "a blue widget");

    // List and search
    let response = app.clone().oneshot(get("/items")).await.unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get("/items/search?q=gadg"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get("/items/search?q=missing"))
        .await
        .unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());

    // Delete
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/items/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get(&format!("/items/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "Item not found");
}

#[tokio::test]
async fn missing_item_returns_not_found() {
    let app = default_app().await;

    let response = app.clone().oneshot(get("/items/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "Item not found");
}

#[tokio::test]
async fn health_reports_status() {
    let app = default_app().await;

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn metrics_exposes_prometheus_text() {
    let app = default_app().await;

    app.clone().oneshot(get("/public")).await.unwrap();

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("gateway_requests_total"));
}
