//! Hostname registration.
//!
//! Grafana registers and removes the hostnames of its users. Every call
//! carries the shared private token and the name of the signed-in user.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use collector_core::{DataAccess, OwnerHostname, Subscription};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::NO_CACHE_HEADERS;
use crate::response::ApiError;
use crate::state::AppState;

pub const PRIVATE_TOKEN_HEADER: &str = "x-token";
pub const GRAFANA_USER_HEADER: &str = "x-grafana-user";

/// Body of both calls.
#[derive(Debug, Deserialize)]
pub struct HostnameRequest {
    #[serde(default)]
    pub hostname: String,
}

impl HostnameRequest {
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))?;
        if request.hostname.trim().is_empty() {
            return Err(ApiError::bad_request("hostname is required"));
        }
        Ok(request)
    }

    fn hostname(&self) -> &str {
        self.hostname.trim()
    }
}

/// Checks the token and returns the storage and the calling user.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(Arc<dyn DataAccess>, String), ApiError> {
    let api = state
        .hostnames
        .as_ref()
        .ok_or_else(|| ApiError::unauthorized("hostname API is disabled"))?;

    let token = headers
        .get(PRIVATE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if token != api.token {
        return Err(ApiError::unauthorized("wrong header[X-Token]"));
    }

    let username = headers
        .get(GRAFANA_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("required header[X-Grafana-User]"))?;

    Ok((api.dao.clone(), username.to_string()))
}

/// POST /hostnames - registers a hostname with a new trial subscription.
pub async fn register_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (dao, username) = authorize(&state, &headers)?;
    let request = HostnameRequest::parse(&body)?;

    let owner = OwnerHostname::new(username, request.hostname(), Subscription::trial(Utc::now()));
    dao.insert_owner_hostname(&owner).await?;

    info!(
        hostname = %owner.hostname,
        username = %owner.username,
        subscription_id = %owner.subscription.id,
        "Hostname registered"
    );
    Ok((StatusCode::CREATED, NO_CACHE_HEADERS, Json(owner)))
}

/// DELETE /hostnames - removes the caller's registration of a hostname.
pub async fn delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (dao, username) = authorize(&state, &headers)?;
    let request = HostnameRequest::parse(&body)?;

    dao.delete_owner_hostname(request.hostname(), &username).await?;

    info!(hostname = request.hostname(), username = %username, "Hostname deleted");
    Ok((StatusCode::OK, NO_CACHE_HEADERS, "ok"))
}
