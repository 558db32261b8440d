//! Health check endpoints.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use telemetry::health;

use super::NO_CACHE_HEADERS;

/// GET /health - the process is up.
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, NO_CACHE_HEADERS, [(header::CONTENT_TYPE, "text/plain")], "ok")
}

/// GET /health/ready - component report; 503 until ClickHouse is reachable.
pub async fn ready_handler() -> impl IntoResponse {
    let status = if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health().report()))
}
