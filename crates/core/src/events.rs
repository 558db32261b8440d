//! Event type definitions for the beacon collector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Multi-valued key/value set (query/form parameters, request headers).
pub type Params = BTreeMap<String, Vec<String>>;

/// Layout of `created_at` timestamps carried by beacons.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One captured beacon request.
///
/// Built once at the HTTP boundary and never mutated afterwards; ownership
/// moves through the pipeline until the event is persisted or archived.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Event {
    /// Query and form parameters of the beacon
    pub request_parameters: Params,
    /// Request headers
    pub headers: Params,
    /// User agent string
    pub user_agent: String,
    /// Remote address of the client
    pub remote_addr: String,
}

impl Event {
    pub fn new(
        request_parameters: Params,
        headers: Params,
        user_agent: impl Into<String>,
        remote_addr: impl Into<String>,
    ) -> Self {
        Self {
            request_parameters,
            headers,
            user_agent: user_agent.into(),
            remote_addr: remote_addr.into(),
        }
    }

    /// First value of a request parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        first(&self.request_parameters, key)
    }

    /// First value of a request header (header names are stored lowercase).
    pub fn header(&self, key: &str) -> Option<&str> {
        first(&self.headers, &key.to_ascii_lowercase())
    }
}

fn first<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|values| values.first())
        .map(String::as_str)
}

/// Flattened, persistence-ready record derived from an [`Event`].
///
/// The pipeline only looks at `hostname`, `subscription_id` and
/// `created_at`; everything else is carried through to storage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RumEvent {
    pub created_at: String,
    pub hostname: String,
    pub subscription_id: String,
    pub url: String,
    pub event_type: String,

    // Client
    pub user_agent: Option<String>,
    pub browser_name: String,
    pub browser_version: Option<String>,
    pub operating_system: String,
    pub operating_system_version: Option<String>,
    pub device_type: String,
    pub ua_vnd: Option<String>,
    pub ua_plt: Option<String>,

    // Geo
    pub geo_country_code: String,
    pub geo_city_name: Option<String>,

    // Session
    pub session_id: String,
    pub session_length: String,
    pub page_id: String,
    pub visibility_state: String,
    pub boomerang_version: String,

    // Navigation timing
    pub next_hop_protocol: String,
    pub connect_duration: Option<String>,
    pub dns_duration: Option<String>,
    pub first_byte_duration: Option<String>,
    pub redirect_duration: Option<String>,
    pub redirects_count: String,

    // Paint timing and web vitals
    pub first_paint: Option<String>,
    pub first_contentful_paint: Option<String>,
    pub largest_contentful_paint: Option<String>,
    pub cumulative_layout_shift: Option<String>,
    pub first_input_delay: Option<String>,

    // Page and device facts
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

    // Network
    pub data_saver_on: Option<String>,
    pub mob_etype: Option<String>,
    pub mob_dl: Option<String>,
    pub mob_rtt: Option<String>,
}

/// "This host was seen at this time", emitted at most once per host per
/// flush window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostnameEvent {
    pub hostname: String,
    pub updated_at: String,
}

impl HostnameEvent {
    pub fn new(hostname: impl Into<String>, updated_at: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            updated_at: updated_at.into(),
        }
    }
}
