//! HTTP surface tests

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use flowgate::server::serve::router;
use flowgate::server::state::ServerState;
use flowgate::services::gateway::DEGRADED_START_MESSAGE;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::fake_scheduler::{gateway_with, FakeScheduler};
use crate::sync_request;

fn app(scheduler: Arc<FakeScheduler>, request_timeout: Duration) -> Router {
    let gateway = Arc::new(gateway_with(scheduler, 16));
    router(Arc::new(ServerState::new(gateway, request_timeout)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_and_version() {
    let app = app(Arc::new(FakeScheduler::new()), Duration::from_secs(5));

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "flowgate");

    let (status, body) = send(&app, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["gitHash"].is_string());
}

#[tokio::test]
async fn test_sync_then_release_over_http() {
    let app = app(Arc::new(FakeScheduler::new()), Duration::from_secs(5));
    let request = serde_json::to_value(sync_request("daily")).unwrap();

    let (status, body) = send(&app, "POST", "/api/v1/workflows/0/sync", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], "OK");
    assert_eq!(body["data"]["workflowCode"], 1000);
    assert_eq!(body["data"]["taskCount"], 2);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/workflows/1000/release",
        Some(json!({"releaseState": "ONLINE"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["workflowCode"], 1000);
}

#[tokio::test]
async fn test_errors_use_the_envelope() {
    let app = app(Arc::new(FakeScheduler::new()), Duration::from_secs(5));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/workflows/abc/release",
        Some(json!({"releaseState": "ONLINE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/workflows/5/release",
        Some(json!({"releaseState": "ONLINE"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, "POST", "/api/v1/workflows/5/sync", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_degraded_start_is_still_success() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.resolve_to(1000);
    let app = app(scheduler.clone(), Duration::from_secs(5));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/workflows/1000/start",
        Some(json!({"projectName": "etl", "workflowName": "daily"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], DEGRADED_START_MESSAGE);
    assert!(body["data"]["instanceId"].is_null());
    assert_eq!(scheduler.starts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_optional_bodies_may_be_empty() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.push_page(vec![json!({"id": 8, "processDefinitionCode": 1000})]);
    let app = app(scheduler.clone(), Duration::from_secs(5));

    let (status, body) = send(&app, "POST", "/api/v1/workflows/1000/delete", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, body) = send(&app, "POST", "/api/v1/workflows/1000/instances/list", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["instances"][0]["instanceId"], 8);
}

#[tokio::test]
async fn test_instance_by_path_id() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler
        .instances
        .lock()
        .unwrap()
        .insert(42, json!({"id": 42, "processDefinitionCode": 1000, "state": "SUCCESS"}));
    let app = app(scheduler, Duration::from_secs(5));

    let (status, body) = send(&app, "POST", "/api/v1/workflows/1000/instances/42", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["instanceId"], 42);
    assert_eq!(body["data"]["state"], "SUCCESS");
}

#[tokio::test]
async fn test_slow_request_times_out() {
    let scheduler = Arc::new(FakeScheduler::new());
    *scheduler.list_delay.lock().unwrap() = Some(Duration::from_millis(500));
    let app = app(scheduler, Duration::from_millis(20));

    let (status, body) = send(&app, "POST", "/api/v1/workflows/1000/instances/get", None).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], "TIMEOUT");
}

#[tokio::test]
async fn test_datasource_listing_query() {
    let app = app(Arc::new(FakeScheduler::new()), Duration::from_secs(5));

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/dolphin/datasources?type=MYSQL&keyword=ware",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["datasources"], json!([]));
}
