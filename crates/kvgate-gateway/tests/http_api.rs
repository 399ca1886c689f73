//! Endpoint tests driven through the axum router with `oneshot()` against
//! the in-memory store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use kvgate_gateway::app_state::AppState;
use kvgate_gateway::config::GatewayConfig;
use kvgate_gateway::obs::gateway::{
    CACHE_HITS_TOTAL, REQUESTS_TOTAL, REQUEST_LATENCY, RESPONSES_TOTAL,
};
use kvgate_gateway::router::build_router;
use kvgate_gateway::store::MemoryStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (Router, AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(GatewayConfig::default(), store.clone());
    (build_router(state.clone()), state, store)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, String) {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn set(app: &Router, key: &str, value: &str) {
    let (status, _) = post_json(app, "/set", json!({ "key": key, "value": value })).await;
    assert_eq!(status, StatusCode::OK);
}

fn parse(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

// ---------------------------------------------------------------------------
// Get / Set
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_then_get_round_trips() {
    let (app, _, _) = setup();
    let (status, body) = post_json(&app, "/set", json!({ "key": "xyz", "value": "456" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body), json!({ "message": "key set" }));

    let (status, body) = get(&app, "/get/xyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body), json!({ "value": "456" }));
}

#[tokio::test]
async fn set_overwrites_in_place() {
    let (app, _, store) = setup();
    set(&app, "k", "1").await;
    set(&app, "k", "2").await;
    assert_eq!(store.len().await, 1);
    let (_, body) = get(&app, "/get/k").await;
    assert_eq!(parse(&body), json!({ "value": "2" }));
}

#[tokio::test]
async fn get_missing_is_404_without_hit() {
    let (app, state, _) = setup();
    let (status, body) = get(&app, "/get/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse(&body), json!({}));
    assert_eq!(state.metrics().cache_hits(), 0);
}

#[tokio::test]
async fn get_hit_counts_cache_hit() {
    let (app, state, _) = setup();
    set(&app, "k", "v").await;
    get(&app, "/get/k").await;
    assert_eq!(state.metrics().cache_hits(), 1);
}

#[tokio::test]
async fn set_missing_field_is_bad_request() {
    let (app, _, store) = setup();
    let (status, body) = post_json(&app, "/set", json!({ "key": "k" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = parse(&body);
    assert_eq!(body["error"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("value"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (app, _, _) = setup();
    let req = Request::post("/set")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn undecodable_key_is_counted_bad_request() {
    let (app, state, _) = setup();
    let (status, body) = get(&app, "/get/%FF").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["error"], "BAD_REQUEST");

    let r = state.metrics().registry();
    assert_eq!(r.counter_value(REQUESTS_TOTAL, &[]), 1);
    assert_eq!(
        r.counter_value(RESPONSES_TOTAL, &[("endpoint", "get"), ("status", "400")]),
        1
    );
}

#[tokio::test]
async fn store_outage_is_503() {
    let (app, _, store) = setup();
    store.set_online(false);
    let (status, body) = get(&app, "/get/k").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(parse(&body)["error"], "STORE_UNAVAILABLE");

    let (status, _) = post_json(&app, "/set", json!({ "key": "k", "value": "v" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Validation still wins over the outage.
    let (status, _) = post_json(&app, "/set", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

async fn seed_search(app: &Router) {
    set(app, "abc-1", "123").await;
    set(app, "abc-2", "456").await;
    set(app, "xyz-1", "789").await;
}

#[tokio::test]
async fn search_by_prefix() {
    let (app, _, _) = setup();
    seed_search(&app).await;
    let (status, body) = get(&app, "/search?prefix=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body), json!({ "abc-1": "123", "abc-2": "456" }));
}

#[tokio::test]
async fn search_by_suffix() {
    let (app, _, _) = setup();
    seed_search(&app).await;
    let (_, body) = get(&app, "/search?suffix=-1").await;
    assert_eq!(parse(&body), json!({ "abc-1": "123", "xyz-1": "789" }));
}

#[tokio::test]
async fn search_prefix_wins_over_suffix() {
    let (app, _, _) = setup();
    seed_search(&app).await;
    let (_, body) = get(&app, "/search?prefix=xyz&suffix=-2").await;
    assert_eq!(parse(&body), json!({ "xyz-1": "789" }));
}

#[tokio::test]
async fn search_without_pattern_is_empty() {
    let (app, _, _) = setup();
    seed_search(&app).await;
    let (status, body) = get(&app, "/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body), json!({}));
}

#[tokio::test]
async fn search_store_failure_is_error_body() {
    let (app, _, store) = setup();
    store.set_online(false);
    let (status, body) = get(&app, "/search?prefix=a").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(parse(&body)["error"], "STORE_UNAVAILABLE");
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_present_then_absent() {
    let (app, state, _) = setup();
    set(&app, "k", "v").await;

    let (status, body) = post_json(&app, "/delete", json!({ "key": "k" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body), json!({ "message": "key deleted" }));
    assert_eq!(state.metrics().cache_hits(), 1);

    let (status, body) = post_json(&app, "/delete", json!({ "key": "k" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body), json!({ "message": "key not found" }));
    assert_eq!(state.metrics().cache_hits(), 1);

    let (status, _) = get(&app, "/get/k").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_without_key_is_bad_request() {
    let (app, _, _) = setup();
    let (status, _) = post_json(&app, "/delete", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Health / metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_up() {
    let (app, _, _) = setup();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert_eq!(body["status"], "UP");
    assert!(body["responseTime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn health_down_is_still_200() {
    let (app, _, store) = setup();
    store.set_online(false);
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert_eq!(body["status"], "DOWN");
    assert_eq!(body["responseTime"].as_f64().unwrap(), -1.0);
}

#[tokio::test]
async fn every_request_is_counted_once() {
    let (app, state, _) = setup();
    set(&app, "k", "v").await;
    get(&app, "/get/k").await;
    get(&app, "/get/nope").await;
    get(&app, "/health").await;

    let r = state.metrics().registry();
    assert_eq!(r.counter_value(REQUESTS_TOTAL, &[]), 4);
    assert_eq!(
        r.counter_value(RESPONSES_TOTAL, &[("endpoint", "get"), ("status", "200")]),
        1
    );
    assert_eq!(
        r.counter_value(RESPONSES_TOTAL, &[("endpoint", "get"), ("status", "404")]),
        1
    );
    assert_eq!(r.histogram_count(REQUEST_LATENCY, &[("endpoint", "get")]), 2);
    assert_eq!(r.histogram_count(REQUEST_LATENCY, &[("endpoint", "health")]), 0);
}

#[tokio::test]
async fn metrics_exposition() {
    let (app, state, _) = setup();
    set(&app, "k", "v").await;
    get(&app, "/get/k").await;
    state.metrics().set_key_count(1);

    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(body.contains("# TYPE kvgate_requests_total counter"));
    assert!(body.contains(&format!("{CACHE_HITS_TOTAL} 1")));
    assert!(body.contains("db_keys_total 1"));
    assert!(body.contains("kvgate_http_responses_total{endpoint=\"set\",status=\"200\"} 1"));
    assert!(body.contains("kvgate_request_latency_seconds_count{endpoint=\"get\"} 1"));
}

#[tokio::test]
async fn concurrent_requests_lose_no_counts() {
    let (app, state, _) = setup();
    set(&app, "k", "v").await;

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let req = Request::get("/get/k").body(Body::empty()).unwrap();
                app.oneshot(req).await.unwrap().status()
            })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(state.metrics().cache_hits(), 64);
    assert_eq!(state.metrics().registry().counter_value(REQUESTS_TOTAL, &[]), 65);
}
