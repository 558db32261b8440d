//! Subscription queries.
//!
//! `FINAL` collapses re-registrations of the same hostname and owner to the
//! newest row.

use crate::client::ClickHouseClient;
use crate::schema::OWN_HOSTNAMES_TABLE;
use chrono::DateTime;
use clickhouse::Row;
use collector_core::{DbErrorCode, Error, Result, Subscription, SubscriptionWithHostname};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Subscription row of `webperf_rum_own_hostnames`.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct SubscriptionRow {
    pub subscription_id: String,
    pub hostname: String,
    /// Seconds since epoch
    pub subscription_expire_at: u32,
}

impl From<SubscriptionRow> for SubscriptionWithHostname {
    fn from(row: SubscriptionRow) -> Self {
        let expires_at =
            DateTime::from_timestamp(i64::from(row.subscription_expire_at), 0).unwrap_or_default();
        SubscriptionWithHostname::new(
            Subscription::new(row.subscription_id, expires_at),
            row.hostname,
        )
    }
}

fn query_error(e: clickhouse::error::Error) -> Error {
    Error::database(DbErrorCode::QueryFailed, format!("Query error: {e}"))
}

/// Fetches every subscription, keyed by id.
///
/// An id bound to several hostnames keeps the last row returned.
pub async fn fetch_subscriptions(
    client: &ClickHouseClient,
) -> Result<HashMap<String, SubscriptionWithHostname>> {
    let sql = format!(
        "SELECT subscription_id, hostname, subscription_expire_at FROM {} FINAL",
        client.table(OWN_HOSTNAMES_TABLE)
    );
    let rows: Vec<SubscriptionRow> = client
        .inner()
        .query(&sql)
        .fetch_all()
        .await
        .map_err(query_error)?;

    debug!(rows = rows.len(), "Fetched subscriptions");
    Ok(rows
        .into_iter()
        .map(|row| (row.subscription_id.clone(), row.into()))
        .collect())
}

/// Fetches one subscription by id.
pub async fn fetch_subscription(
    client: &ClickHouseClient,
    id: &str,
) -> Result<Option<SubscriptionWithHostname>> {
    let sql = format!(
        "SELECT subscription_id, hostname, subscription_expire_at FROM {} FINAL WHERE subscription_id = ? LIMIT 1",
        client.table(OWN_HOSTNAMES_TABLE)
    );
    let row: Option<SubscriptionRow> = client
        .inner()
        .query(&sql)
        .bind(id)
        .fetch_optional()
        .await
        .map_err(query_error)?;

    Ok(row.map(Into::into))
}

/// Deletes the registration of `hostname` by `username`.
///
/// Waits for the mutation so a following lookup no longer sees the row.
pub async fn delete_owner_hostname(
    client: &ClickHouseClient,
    hostname: &str,
    username: &str,
) -> Result<()> {
    let sql = format!(
        "ALTER TABLE {} DELETE WHERE hostname = ? AND username = ? SETTINGS mutations_sync = 1",
        client.table(OWN_HOSTNAMES_TABLE)
    );
    client
        .inner()
        .query(&sql)
        .bind(hostname)
        .bind(username)
        .execute()
        .await
        .map_err(|e| {
            Error::database(DbErrorCode::StoreFailed, format!("Delete error: {e}"))
        })?;

    debug!(hostname, username, "Deleted owner hostname");
    Ok(())
}
