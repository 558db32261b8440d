//! ClickHouse table schemas.
//!
//! Table names carry the configured prefix; `{prefix}` in the DDL templates
//! is replaced before execution.

pub const RUM_EVENTS_TABLE: &str = "webperf_rum_events";
pub const HOSTNAMES_TABLE: &str = "webperf_rum_hostnames";
pub const OWN_HOSTNAMES_TABLE: &str = "webperf_rum_own_hostnames";

const PREFIX_PLACEHOLDER: &str = "{prefix}";

/// RUM events, one row per persisted beacon.
const CREATE_RUM_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS {prefix}webperf_rum_events (
    created_at DateTime,
    hostname LowCardinality(String),
    subscription_id String,
    url String,
    event_type LowCardinality(String),

    -- Client
    user_agent Nullable(String),
    browser_name LowCardinality(String),
    browser_version Nullable(String),
    operating_system LowCardinality(String),
    operating_system_version Nullable(String),
    device_type LowCardinality(String),
    ua_vnd Nullable(String),
    ua_plt Nullable(String),

    -- Geo
    geo_country_code LowCardinality(String),
    geo_city_name Nullable(String),

    -- Session
    session_id String,
    session_length String,
    page_id String,
    visibility_state LowCardinality(String),
    boomerang_version LowCardinality(String),

    -- Navigation timing
    next_hop_protocol LowCardinality(String),
    connect_duration Nullable(String),
    dns_duration Nullable(String),
    first_byte_duration Nullable(String),
    redirect_duration Nullable(String),
    redirects_count String,

    -- Paint timing and web vitals
    first_paint Nullable(String),
    first_contentful_paint Nullable(String),
    largest_contentful_paint Nullable(String),
    cumulative_layout_shift Nullable(String),
    first_input_delay Nullable(String),

    -- Page and device facts
    screen_width Nullable(String),
    screen_height Nullable(String),
    dom_res Nullable(String),
    dom_doms Nullable(String),
    dom_ln Nullable(String),
    dom_sz Nullable(String),
    dom_img Nullable(String),
    dom_script Nullable(String),
    mem_total Nullable(String),
    mem_limit Nullable(String),
    mem_used Nullable(String),
    cpu_cnc Nullable(String),

    -- Network
    data_saver_on Nullable(String),
    mob_etype Nullable(String),
    mob_dl Nullable(String),
    mob_rtt Nullable(String)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(created_at)
ORDER BY (hostname, created_at)
SETTINGS index_granularity = 8192
"#;

/// Last activity per hostname; merges keep the newest row.
const CREATE_HOSTNAMES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS {prefix}webperf_rum_hostnames (
    hostname String,
    updated_at DateTime
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY hostname
"#;

/// Hostnames registered by owners, with their subscription.
const CREATE_OWN_HOSTNAMES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS {prefix}webperf_rum_own_hostnames (
    username String,
    hostname String,
    subscription_id String,
    subscription_expire_at DateTime,
    created_at DateTime DEFAULT now()
)
ENGINE = ReplacingMergeTree(created_at)
ORDER BY (hostname, username)
"#;

/// DDL for every table, with the prefix applied.
pub fn all_tables(prefix: &str) -> Vec<String> {
    [
        CREATE_RUM_EVENTS_TABLE,
        CREATE_HOSTNAMES_TABLE,
        CREATE_OWN_HOSTNAMES_TABLE,
    ]
    .iter()
    .map(|ddl| ddl.replace(PREFIX_PLACEHOLDER, prefix))
    .collect()
}
