//! Beacon catcher endpoint.
//!
//! Boomerang sends its beacon either as a query string (GET) or as a
//! form-encoded body (POST). Both are folded into one parameter set.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use collector_core::{Event, Params, CREATED_AT_FORMAT};
use tracing::debug;

use super::NO_CACHE_HEADERS;
use crate::extractors::ClientIp;
use crate::state::AppState;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// GET|POST /beacon/catcher - captures one beacon.
///
/// Always answers 204; the event is handed to the processor without
/// waiting for routing.
pub async fn catcher_handler(
    State(state): State<AppState>,
    ClientIp(remote_addr): ClientIp,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event = event_from_request(&headers, query.as_deref(), &body, remote_addr);
    debug!(
        params = event.request_parameters.len(),
        remote_addr = %event.remote_addr,
        "Beacon received"
    );
    state.sink.save_async(event);

    (StatusCode::NO_CONTENT, NO_CACHE_HEADERS)
}

/// Builds an [`Event`] from the parts of a beacon request.
///
/// Form body values come before query values for the same key.
pub fn event_from_request(
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
    remote_addr: String,
) -> Event {
    let mut params = Params::new();
    if is_form(headers) {
        append_pairs(&mut params, body);
    }
    if let Some(query) = query {
        append_pairs(&mut params, query.as_bytes());
    }

    // Re-imported beacons carry their own timestamp
    params.entry("created_at".to_string()).or_insert_with(|| {
        vec![Utc::now().format(CREATED_AT_FORMAT).to_string()]
    });

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Event::new(params, header_params(headers), user_agent, remote_addr)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with(FORM_CONTENT_TYPE))
}

fn append_pairs(params: &mut Params, input: &[u8]) {
    for (key, value) in url::form_urlencoded::parse(input) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
}

/// Header names arrive lowercase from `http`; invalid UTF-8 values are
/// decoded lossily.
fn header_params(headers: &HeaderMap) -> Params {
    let mut params = Params::new();
    for (name, value) in headers {
        params
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    params
}
