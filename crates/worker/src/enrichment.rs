//! Beacon flattening and user agent enrichment.
//!
//! Turns the raw beacon parameters of an [`Event`] into a [`RumEvent`]:
//! navigation timing deltas, paint metrics, page facts, and
//! browser/OS/device from the user agent.

use collector_core::{Event, RumEvent};
use woothee::parser::Parser;

/// Largest timing delta stored; larger values are clamped.
const MAX_DELTA: i64 = 65_535;

/// Builds the persistence record for an event.
pub trait RumEventFactory: Send + Sync {
    fn create(&self, event: &Event) -> RumEvent;
}

/// Boomerang beacon mapping with woothee user agent parsing.
///
/// Country and city come from the Cloudflare `CF-IPCountry` / `CF-IPCity`
/// headers when present.
pub struct BeaconRumEventFactory {
    parser: Parser,
}

impl BeaconRumEventFactory {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }
}

impl Default for BeaconRumEventFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RumEventFactory for BeaconRumEventFactory {
    fn create(&self, event: &Event) -> RumEvent {
        let get = |key: &str| event.param(key).unwrap_or_default().to_string();
        let opt = |key: &str| event.param(key).filter(|v| !v.is_empty()).map(str::to_string);

        let url = get("u");
        let hostname = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let (screen_width, screen_height) = screen_size(event.param("scr.xy"));

        let mut rum = RumEvent {
            created_at: get("created_at"),
            hostname,
            subscription_id: get("subscription_id"),
            url,
            event_type: event_type(event),

            user_agent: Some(event.user_agent.clone()).filter(|ua| !ua.is_empty()),
            device_type: "unknown".to_string(),
            ua_vnd: opt("ua.vnd"),
            ua_plt: opt("ua.plt"),

            geo_country_code: header_value(event, "cf-ipcountry").unwrap_or_default(),
            geo_city_name: header_value(event, "cf-ipcity"),

            session_id: get("rt.si"),
            session_length: get("rt.sl"),
            page_id: get("pid"),
            visibility_state: get("vis.st"),
            boomerang_version: get("v"),

            next_hop_protocol: get("nt_protocol"),
            connect_duration: delta(event, "nt_con_st", "nt_con_end"),
            dns_duration: delta(event, "nt_dns_st", "nt_dns_end"),
            first_byte_duration: delta(event, "nt_nav_st", "nt_res_st"),
            redirect_duration: Some("0".to_string()),
            redirects_count: "0".to_string(),

            first_paint: opt("pt.fp"),
            first_contentful_paint: opt("pt.fcp"),
            largest_contentful_paint: opt("pt.lcp"),
            cumulative_layout_shift: opt("c.cls"),
            first_input_delay: opt("et.fid"),

            screen_width,
            screen_height,
            dom_res: opt("dom.res"),
            dom_doms: opt("dom.doms"),
            dom_ln: opt("dom.ln"),
            dom_sz: opt("dom.sz"),
            dom_img: opt("dom.img"),
            dom_script: opt("dom.script"),
            mem_total: opt("mem.total"),
            mem_limit: opt("mem.limit"),
            mem_used: opt("mem.used"),
            cpu_cnc: opt("cpu.cnc"),

            data_saver_on: opt("net.sd"),
            mob_etype: opt("mob.etype"),
            mob_dl: opt("mob.dl"),
            mob_rtt: opt("mob.rtt"),

            ..Default::default()
        };

        self.enrich(&mut rum, &event.user_agent);
        rum
    }
}

impl BeaconRumEventFactory {
    fn enrich(&self, rum: &mut RumEvent, user_agent: &str) {
        if user_agent.is_empty() {
            return;
        }

        if let Some(result) = self.parser.parse(user_agent) {
            rum.browser_name = known(result.name).unwrap_or_default();
            rum.browser_version = known(result.version);
            rum.operating_system = known(result.os).unwrap_or_default();
            rum.operating_system_version = known(&result.os_version.to_string());

            // woothee categories: pc, smartphone, mobilephone, crawler, appliance, misc
            rum.device_type = match result.category {
                "pc" => "desktop",
                "smartphone" | "mobilephone" => "mobile",
                "crawler" => "bot",
                "appliance" => "other",
                _ => "unknown",
            }
            .to_string();
        }
    }
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != "UNKNOWN").then(|| value.to_string())
}

/// `http_initiator` wins; otherwise a quit beacon or a page visit.
fn event_type(event: &Event) -> String {
    match event.param("http_initiator") {
        Some(initiator) if !initiator.is_empty() => initiator.to_string(),
        _ if event.request_parameters.contains_key("rt.quit") => "quit_page".to_string(),
        _ => "visit_page".to_string(),
    }
}

/// `end - start` in milliseconds, clamped to `[0, 65535]`.
fn delta(event: &Event, start: &str, end: &str) -> Option<String> {
    let start = event.param(start).filter(|v| !v.is_empty())?;
    let end = event.param(end).filter(|v| !v.is_empty())?;
    let start: i64 = start.trim().parse().unwrap_or(0);
    let end: i64 = end.trim().parse().unwrap_or(0);
    Some(end.saturating_sub(start).clamp(0, MAX_DELTA).to_string())
}

/// Splits `WIDTHxHEIGHT`.
fn screen_size(value: Option<&str>) -> (Option<String>, Option<String>) {
    match value.and_then(|v| v.split_once('x')) {
        Some((w, h)) if !h.contains('x') => (Some(w.to_string()), Some(h.to_string())),
        _ => (None, None),
    }
}

fn header_value(event: &Event, name: &str) -> Option<String> {
    let value = event.header(name)?.trim().trim_matches('"').trim();
    (!value.is_empty()).then(|| value.to_string())
}
