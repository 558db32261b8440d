//! Tests for the beacon catcher endpoint.

use axum::http::StatusCode;
use axum_test::TestServer;
use collector_core::CREATED_AT_FORMAT;
use integration_tests::fixtures::{beacon_params, CHROME_UA};
use integration_tests::setup::recording_router;

/// GET beacon: 204 with no-cache headers, one event handed off
#[tokio::test]
async fn test_get_beacon_is_captured() {
    let (sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server
        .get("/beacon/catcher")
        .add_query_params(beacon_params("shop.example.com", "sub-1"))
        .add_header("User-Agent", CHROME_UA)
        .add_header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
        .await;

    response.assert_status(StatusCode::NO_CONTENT);
    assert_eq!(
        response.header("cache-control"),
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(response.header("expires"), "Fri, 01 Jan 1990 00:00:00 GMT");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.param("u"), Some("https://shop.example.com/products?id=7"));
    assert_eq!(event.param("subscription_id"), Some("sub-1"));
    assert_eq!(event.user_agent, CHROME_UA);
    assert_eq!(event.remote_addr, "203.0.113.7");
    assert_eq!(event.header("x-forwarded-for"), Some("203.0.113.7, 10.0.0.1"));

    let created_at = event.param("created_at").expect("created_at should be set");
    assert!(chrono::NaiveDateTime::parse_from_str(created_at, CREATED_AT_FORMAT).is_ok());
}

/// POST beacon with a form body
#[tokio::test]
async fn test_post_form_beacon_is_captured() {
    let (sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    let response = server
        .post("/beacon/catcher")
        .form(&beacon_params("shop.example.com", "sub-2"))
        .await;

    response.assert_status(StatusCode::NO_CONTENT);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].param("subscription_id"), Some("sub-2"));
    assert_eq!(events[0].param("scr.xy"), Some("1920x1080"));
}

/// A beacon that carries its own timestamp keeps it
#[tokio::test]
async fn test_created_at_is_not_overwritten() {
    let (sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    server
        .get("/beacon/catcher")
        .add_query_param("created_at", "2023-05-06 07:08:09")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(
        sink.events()[0].param("created_at"),
        Some("2023-05-06 07:08:09")
    );
}

/// An empty beacon is still accepted
#[tokio::test]
async fn test_empty_beacon_is_accepted() {
    let (sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    server
        .get("/beacon/catcher")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].request_parameters.len(), 1);
}
