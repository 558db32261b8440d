//! End-to-end tests: HTTP catcher, processor, mock DAO and file backup.

use axum::http::StatusCode;
use axum_test::TestServer;
use backup::{Category, CompressionStrategy};
use chrono::Utc;
use integration_tests::fixtures::{
    active_subscription, beacon_params, expired_subscription, CHROME_UA,
};
use integration_tests::mocks::{ExplodingFactory, MockDao};
use integration_tests::setup::TestContext;
use std::fs;
use std::sync::Arc;
use worker::ProcessorConfig;

const HOST: &str = "shop.example.com";
const HOST_KEY: &str = "shop_example_com";

async fn send_beacons(ctx: &TestContext, subscription_id: &str, n: usize) {
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    for _ in 0..n {
        server
            .get("/beacon/catcher")
            .add_query_params(beacon_params(HOST, subscription_id))
            .add_header("User-Agent", CHROME_UA)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }
}

/// Found: persisted and the host recorded once
#[tokio::test]
async fn test_found_events_are_persisted() {
    let dao = MockDao::new();
    dao.add_subscription(active_subscription("sub-ok", HOST));
    let ctx = TestContext::new(dao).await;

    send_beacons(&ctx, "sub-ok", 3).await;
    ctx.shutdown().await;

    let saved = ctx.dao.saved_events();
    assert_eq!(saved.len(), 3);
    assert!(saved.iter().all(|e| e.hostname == HOST && e.subscription_id == "sub-ok"));
    assert_eq!(saved[0].browser_name, "Chrome");
    assert_eq!(saved[0].dns_duration.as_deref(), Some("20"));
    assert_eq!(saved[0].screen_width.as_deref(), Some("1920"));

    let hosts = ctx.dao.saved_hosts();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].hostname, HOST);

    for category in Category::ALL {
        assert!(ctx.backup_lines(category, HOST_KEY).is_empty());
    }
}

/// Expired: archived in the expired category, never persisted
#[tokio::test]
async fn test_expired_events_are_archived() {
    let dao = MockDao::new();
    dao.add_subscription(expired_subscription("sub-old", HOST));
    let ctx = TestContext::new(dao).await;

    send_beacons(&ctx, "sub-old", 2).await;
    ctx.shutdown().await;

    assert!(ctx.dao.saved_events().is_empty());
    assert!(ctx.dao.saved_hosts().is_empty());

    let lines = ctx.backup_lines(Category::Expired, HOST_KEY);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["subscription_id"], "sub-old");
    assert_eq!(lines[0]["u"], format!("https://{HOST}/products?id=7"));
    assert!(lines[0]["request_headers"].as_str().unwrap().contains("user-agent"));
    assert!(ctx.backup_lines(Category::Unknown, HOST_KEY).is_empty());
}

/// Unknown id and hostname mismatch both land in the unknown category
#[tokio::test]
async fn test_unknown_events_are_archived() {
    let dao = MockDao::new();
    dao.add_subscription(active_subscription("sub-other", "other.example.com"));
    let ctx = TestContext::new(dao).await;

    send_beacons(&ctx, "sub-missing", 1).await;
    send_beacons(&ctx, "sub-other", 1).await;
    ctx.shutdown().await;

    assert!(ctx.dao.saved_events().is_empty());
    let lines = ctx.backup_lines(Category::Unknown, HOST_KEY);
    let ids: Vec<&str> = lines
        .iter()
        .filter_map(|l| l["subscription_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["sub-missing", "sub-other"]);
}

/// A failed save is not retried or archived, but the host still counts
#[tokio::test]
async fn test_persist_failure_is_swallowed() {
    let dao = MockDao::new();
    dao.add_subscription(active_subscription("sub-ok", HOST));
    dao.set_fail_saves(true);
    let ctx = TestContext::new(dao).await;

    send_beacons(&ctx, "sub-ok", 2).await;
    ctx.shutdown().await;

    assert!(ctx.dao.saved_events().is_empty());
    assert_eq!(ctx.dao.saved_hosts().len(), 1);
    for category in Category::ALL {
        assert!(ctx.backup_lines(category, HOST_KEY).is_empty());
    }
}

/// With archiving of all events on, found events are also archived
#[tokio::test]
async fn test_archive_all_events() {
    let dao = MockDao::new();
    dao.add_subscription(active_subscription("sub-ok", HOST));
    let ctx = TestContext::with_config(
        dao,
        ProcessorConfig {
            archive_all_events: Some(true),
            ..Default::default()
        },
    )
    .await;

    send_beacons(&ctx, "sub-ok", 2).await;
    ctx.shutdown().await;

    assert_eq!(ctx.dao.saved_events().len(), 2);
    assert_eq!(ctx.backup_lines(Category::Archive, HOST_KEY).len(), 2);
}

/// A crashed processor still leaves its archived lines on disk
#[tokio::test]
async fn test_backup_flushed_when_processor_fails() {
    let dao = MockDao::new();
    dao.add_subscription(expired_subscription("sub-old", HOST));
    let ctx = TestContext::with_factory(
        dao,
        ProcessorConfig::default(),
        Arc::new(ExplodingFactory::new("sub-boom")),
    )
    .await;

    send_beacons(&ctx, "sub-old", 2).await;
    send_beacons(&ctx, "sub-boom", 1).await;

    let err = ctx.drain().await.expect_err("processor failure is reported");
    assert!(err.to_string().contains("processor task failed"));
    assert_eq!(ctx.backup_lines(Category::Expired, HOST_KEY).len(), 2);
}

/// Archived hour files compact into a day archive plus summary
#[tokio::test]
async fn test_archived_day_is_compacted() {
    let ctx = TestContext::new(MockDao::new()).await;

    let first_day = Utc::now().date_naive();
    send_beacons(&ctx, "sub-missing", 4).await;
    ctx.shutdown().await;
    let last_day = Utc::now().date_naive();

    // beacons may straddle an hour or a midnight
    let layout = ctx.layout(Category::Unknown);
    let mut days = vec![first_day];
    if last_day != first_day {
        days.push(last_day);
    }
    days.retain(|day| layout.day_dir(HOST_KEY, *day).exists());
    assert!(!days.is_empty());

    let mut archived = 0;
    for day in days {
        let results = ctx.backup.compress_day(day).await;
        for (category, result) in &results {
            assert!(result.is_ok(), "{category:?}: {result:?}");
        }

        let summary = fs::read_to_string(layout.day_summary(HOST_KEY, day)).expect("summary");
        let mut expected_start = 1;
        for row in summary.lines() {
            let fields: Vec<u32> = row.split(',').map(|f| f.parse().unwrap()).collect();
            assert_eq!(fields.len(), 3, "{row}");
            assert!(fields[0] < 24);
            assert_eq!(fields[1], expected_start);
            assert!(fields[2] >= fields[1]);
            expected_start = fields[2] + 1;
        }

        let archive =
            fs::read_to_string(layout.day_archive(HOST_KEY, day, CompressionStrategy::None))
                .expect("archive");
        assert_eq!(archive.lines().count() as u32, expected_start - 1);
        archived += archive.lines().count();
        assert!(!layout.day_dir(HOST_KEY, day).exists());
    }
    assert_eq!(archived, 4);
}
