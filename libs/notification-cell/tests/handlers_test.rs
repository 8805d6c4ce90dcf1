mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use common::TestHarness;
use notification_cell::notification_routes;

async fn send(harness: &TestHarness, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = notification_routes(harness.service.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_process_endpoint_runs_a_batch() {
    let harness = TestHarness::new();
    harness.insert_pending(harness.now()).await;

    let (status, body) = send(&harness, "POST", "/process").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["processed"], 1);
    assert_eq!(body["data"]["successful"], 1);
    assert_eq!(body["data"]["failed"], 0);
}

#[tokio::test]
async fn test_stats_endpoint_reports_counts() {
    let harness = TestHarness::new();
    harness.insert_pending(harness.now()).await;
    harness
        .insert_pending(harness.now() + chrono::Duration::hours(2))
        .await;
    send(&harness, "POST", "/process").await;

    let (status, body) = send(&harness, "GET", "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pending"], 1);
    assert_eq!(body["data"]["sent"], 1);
}
