//! Tests for health check endpoints.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::setup::recording_router;

/// /health answers a plain `ok` that is never cached
#[tokio::test]
async fn test_health_endpoint_ok() {
    let (_sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");
    assert_eq!(
        response.header("cache-control"),
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(response.header("pragma"), "no-cache");
}

/// /health/ready reports every component
#[tokio::test]
async fn test_ready_endpoint_structure() {
    let (_sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server.get("/health/ready").await;
    let status = response.status_code();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status {status}"
    );

    let body: serde_json::Value = response.json();
    let components = body["components"]
        .as_array()
        .expect("Response should have 'components'");
    let names: Vec<&str> = components
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["clickhouse", "backup"]);
    assert!(body.get("status").is_some());
}

/// Unknown routes are not served
#[tokio::test]
async fn test_unknown_route() {
    let (_sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server.get("/beacon/nope").expect_failure().await;
    response.assert_status(StatusCode::NOT_FOUND);
}
