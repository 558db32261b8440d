//! Insert helpers for ClickHouse.

use crate::client::ClickHouseClient;
use crate::schema::{HOSTNAMES_TABLE, OWN_HOSTNAMES_TABLE, RUM_EVENTS_TABLE};
use chrono::NaiveDateTime;
use clickhouse::Row;
use collector_core::{
    DbErrorCode, Error, HostnameEvent, OwnerHostname, Result, RumEvent, CREATED_AT_FORMAT,
};
use serde::Serialize;
use telemetry::metrics;
use tracing::debug;

/// Row of `webperf_rum_events`.
#[derive(Debug, Clone, Row, Serialize)]
pub struct RumEventRow {
    /// Seconds since epoch (ClickHouse `DateTime`)
    pub created_at: u32,
    pub hostname: String,
    pub subscription_id: String,
    pub url: String,
    pub event_type: String,

    pub user_agent: Option<String>,
    pub browser_name: String,
    pub browser_version: Option<String>,
    pub operating_system: String,
    pub operating_system_version: Option<String>,
    pub device_type: String,
    pub ua_vnd: Option<String>,
    pub ua_plt: Option<String>,

    pub geo_country_code: String,
    pub geo_city_name: Option<String>,

    pub session_id: String,
    pub session_length: String,
    pub page_id: String,
    pub visibility_state: String,
    pub boomerang_version: String,

    pub next_hop_protocol: String,
    pub connect_duration: Option<String>,
    pub dns_duration: Option<String>,
    pub first_byte_duration: Option<String>,
    pub redirect_duration: Option<String>,
    pub redirects_count: String,

    pub first_paint: Option<String>,
    pub first_contentful_paint: Option<String>,
    pub largest_contentful_paint: Option<String>,
    pub cumulative_layout_shift: Option<String>,
    pub first_input_delay: Option<String>,

    pub screen_width: Option<String>,
    pub screen_height: Option<String>,
    pub dom_res: Option<String>,
    pub dom_doms: Option<String>,
    pub dom_ln: Option<String>,
    pub dom_sz: Option<String>,
    pub dom_img: Option<String>,
    pub dom_script: Option<String>,
    pub mem_total: Option<String>,
    pub mem_limit: Option<String>,
    pub mem_used: Option<String>,
    pub cpu_cnc: Option<String>,

    pub data_saver_on: Option<String>,
    pub mob_etype: Option<String>,
    pub mob_dl: Option<String>,
    pub mob_rtt: Option<String>,
}

impl TryFrom<&RumEvent> for RumEventRow {
    type Error = Error;

    fn try_from(event: &RumEvent) -> Result<Self> {
        let event = event.clone();
        Ok(Self {
            created_at: epoch_seconds(&event.created_at)?,
            hostname: event.hostname,
            subscription_id: event.subscription_id,
            url: event.url,
            event_type: event.event_type,

            user_agent: event.user_agent,
            browser_name: event.browser_name,
            browser_version: event.browser_version,
            operating_system: event.operating_system,
            operating_system_version: event.operating_system_version,
            device_type: event.device_type,
            ua_vnd: event.ua_vnd,
            ua_plt: event.ua_plt,

            geo_country_code: event.geo_country_code,
            geo_city_name: event.geo_city_name,

            session_id: event.session_id,
            session_length: event.session_length,
            page_id: event.page_id,
            visibility_state: event.visibility_state,
            boomerang_version: event.boomerang_version,

            next_hop_protocol: event.next_hop_protocol,
            connect_duration: event.connect_duration,
            dns_duration: event.dns_duration,
            first_byte_duration: event.first_byte_duration,
            redirect_duration: event.redirect_duration,
            redirects_count: event.redirects_count,

            first_paint: event.first_paint,
            first_contentful_paint: event.first_contentful_paint,
            largest_contentful_paint: event.largest_contentful_paint,
            cumulative_layout_shift: event.cumulative_layout_shift,
            first_input_delay: event.first_input_delay,

            screen_width: event.screen_width,
            screen_height: event.screen_height,
            dom_res: event.dom_res,
            dom_doms: event.dom_doms,
            dom_ln: event.dom_ln,
            dom_sz: event.dom_sz,
            dom_img: event.dom_img,
            dom_script: event.dom_script,
            mem_total: event.mem_total,
            mem_limit: event.mem_limit,
            mem_used: event.mem_used,
            cpu_cnc: event.cpu_cnc,

            data_saver_on: event.data_saver_on,
            mob_etype: event.mob_etype,
            mob_dl: event.mob_dl,
            mob_rtt: event.mob_rtt,
        })
    }
}

/// Row of `webperf_rum_hostnames`.
#[derive(Debug, Clone, Row, Serialize)]
pub struct HostnameRow {
    pub hostname: String,
    pub updated_at: u32,
}

impl TryFrom<&HostnameEvent> for HostnameRow {
    type Error = Error;

    fn try_from(event: &HostnameEvent) -> Result<Self> {
        Ok(Self {
            hostname: event.hostname.clone(),
            updated_at: epoch_seconds(&event.updated_at)?,
        })
    }
}

/// Row of `webperf_rum_own_hostnames`; `created_at` is filled by the server.
#[derive(Debug, Clone, Row, Serialize)]
pub struct OwnerHostnameRow {
    pub username: String,
    pub hostname: String,
    pub subscription_id: String,
    pub subscription_expire_at: u32,
}

impl TryFrom<&OwnerHostname> for OwnerHostnameRow {
    type Error = Error;

    fn try_from(owner: &OwnerHostname) -> Result<Self> {
        let expires_at = owner.subscription.expires_at.timestamp();
        Ok(Self {
            username: owner.username.clone(),
            hostname: owner.hostname.clone(),
            subscription_id: owner.subscription.id.clone(),
            subscription_expire_at: u32::try_from(expires_at).map_err(|_| {
                Error::database(
                    DbErrorCode::StoreFailed,
                    format!("expiry {expires_at} out of DateTime range"),
                )
            })?,
        })
    }
}

/// Parses a `YYYY-MM-DD HH:MM:SS` UTC timestamp into epoch seconds.
pub fn epoch_seconds(value: &str) -> Result<u32> {
    let parsed = NaiveDateTime::parse_from_str(value, CREATED_AT_FORMAT).map_err(|e| {
        Error::database(
            DbErrorCode::StoreFailed,
            format!("invalid timestamp {value:?}: {e}"),
        )
    })?;
    u32::try_from(parsed.and_utc().timestamp()).map_err(|_| {
        Error::database(
            DbErrorCode::StoreFailed,
            format!("timestamp {value:?} out of DateTime range"),
        )
    })
}

/// Inserts one RUM event.
pub async fn insert_rum_event(client: &ClickHouseClient, event: &RumEvent) -> Result<()> {
    let row = RumEventRow::try_from(event)?;
    insert_row(client, &client.table(RUM_EVENTS_TABLE), &row).await
}

/// Inserts one hostname activity row.
pub async fn insert_hostname(client: &ClickHouseClient, event: &HostnameEvent) -> Result<()> {
    let row = HostnameRow::try_from(event)?;
    insert_row(client, &client.table(HOSTNAMES_TABLE), &row).await
}

/// Registers an owner hostname.
pub async fn insert_owner_hostname(client: &ClickHouseClient, owner: &OwnerHostname) -> Result<()> {
    let row = OwnerHostnameRow::try_from(owner)?;
    insert_row(client, &client.table(OWN_HOSTNAMES_TABLE), &row).await
}

async fn insert_row<T>(client: &ClickHouseClient, table: &str, row: &T) -> Result<()>
where
    T: Row + Serialize,
{
    let start = std::time::Instant::now();

    let fail = |stage: &str, e: clickhouse::error::Error| {
        metrics().clickhouse_errors.inc();
        Error::database(DbErrorCode::StoreFailed, format!("{stage} error on {table}: {e}"))
    };

    let mut insert = client.inner().insert(table).map_err(|e| fail("Insert", e))?;
    insert.write(row).await.map_err(|e| fail("Write", e))?;
    insert.end().await.map_err(|e| fail("End", e))?;

    let elapsed = start.elapsed();
    metrics().clickhouse_latency_ms.observe(elapsed.as_millis() as u64);
    metrics().clickhouse_inserts.inc();

    debug!(table, latency_ms = elapsed.as_millis(), "Inserted row");
    Ok(())
}
