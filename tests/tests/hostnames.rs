//! Tests for hostname registration.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Months, Utc};
use collector_core::Lookup;
use integration_tests::mocks::MockDao;
use integration_tests::setup::{hostname_router, recording_router};
use serde_json::json;
use std::sync::Arc;
use worker::{CachingSubscriptionService, SubscriptionService};

const TOKEN: &str = "private-token-1";

fn server(dao: Arc<MockDao>) -> TestServer {
    TestServer::new(hostname_router(dao, TOKEN)).expect("Failed to create test server")
}

/// POST registers the hostname with a three month trial
#[tokio::test]
async fn test_register_hostname() {
    let dao = Arc::new(MockDao::new());
    let server = server(dao.clone());

    let before = Utc::now();
    let response = server
        .post("/hostnames")
        .add_header("X-Token", TOKEN)
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "shop.example.com" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(
        response.header("cache-control"),
        "no-cache, no-store, must-revalidate"
    );

    let owners = dao.owner_hostnames();
    assert_eq!(owners.len(), 1);
    let owner = &owners[0];
    assert_eq!(owner.username, "user1");
    assert_eq!(owner.hostname, "shop.example.com");
    assert!(owner.subscription.expires_at >= before + Months::new(3));

    let body: serde_json::Value = response.json();
    assert_eq!(body["subscription"]["id"], owner.subscription.id.as_str());
}

/// A registered hostname's subscription is found by the beacon lookup
#[tokio::test]
async fn test_registered_subscription_is_found() {
    let dao = Arc::new(MockDao::new());
    let mut lookups = CachingSubscriptionService::new(dao.clone());
    lookups.load().await.unwrap();

    server(dao.clone())
        .post("/hostnames")
        .add_header("X-Token", TOKEN)
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "shop.example.com" }))
        .await
        .assert_status(StatusCode::CREATED);

    let id = dao.owner_hostnames()[0].subscription.id.clone();
    assert_eq!(
        lookups.get_subscription(&id, "shop.example.com").await.unwrap(),
        Lookup::Found
    );
    assert_eq!(
        lookups.get_subscription(&id, "other.example.com").await.unwrap(),
        Lookup::NotFound
    );
}

/// Registering again replaces the subscription
#[tokio::test]
async fn test_register_twice_replaces() {
    let dao = Arc::new(MockDao::new());
    let server = server(dao.clone());

    for _ in 0..2 {
        server
            .post("/hostnames")
            .add_header("X-Token", TOKEN)
            .add_header("X-Grafana-User", "user1")
            .json(&json!({ "hostname": "shop.example.com" }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    assert_eq!(dao.owner_hostnames().len(), 1);
}

/// DELETE removes only the caller's registration
#[tokio::test]
async fn test_delete_hostname() {
    let dao = Arc::new(MockDao::new());
    let server = server(dao.clone());

    for user in ["user1", "user2"] {
        server
            .post("/hostnames")
            .add_header("X-Token", TOKEN)
            .add_header("X-Grafana-User", user)
            .json(&json!({ "hostname": "shop.example.com" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .delete("/hostnames")
        .add_header("X-Token", TOKEN)
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "shop.example.com" }))
        .await;
    response.assert_status_ok();
    response.assert_text("ok");

    let owners = dao.owner_hostnames();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].username, "user2");
}

/// A wrong or missing token is rejected before anything is stored
#[tokio::test]
async fn test_wrong_token_rejected() {
    let dao = Arc::new(MockDao::new());
    let server = server(dao.clone());

    let response = server
        .post("/hostnames")
        .add_header("X-Token", "guess")
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "shop.example.com" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_001");

    server
        .delete("/hostnames")
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "shop.example.com" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    assert!(dao.owner_hostnames().is_empty());
}

/// Without a configured token the API is closed
#[tokio::test]
async fn test_disabled_without_token() {
    let (_sink, router) = recording_router();
    let server = TestServer::new(router).expect("Failed to create test server");

    server
        .post("/hostnames")
        .add_header("X-Token", "")
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "shop.example.com" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

/// Missing user header and missing hostname are bad requests
#[tokio::test]
async fn test_invalid_requests() {
    let dao = Arc::new(MockDao::new());
    let server = server(dao.clone());

    let response = server
        .post("/hostnames")
        .add_header("X-Token", TOKEN)
        .json(&json!({ "hostname": "shop.example.com" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "required header[X-Grafana-User]");

    let response = server
        .post("/hostnames")
        .add_header("X-Token", TOKEN)
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "hostname is required");

    assert!(dao.owner_hostnames().is_empty());
}

/// Storage failures surface with their database code
#[tokio::test]
async fn test_storage_failure() {
    let dao = Arc::new(MockDao::new());
    dao.set_fail_saves(true);

    let response = server(dao)
        .post("/hostnames")
        .add_header("X-Token", TOKEN)
        .add_header("X-Grafana-User", "user1")
        .json(&json!({ "hostname": "shop.example.com" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DB_001");
}
