//! HTTP routes.

pub mod beacon;
pub mod health;
pub mod hostnames;

use axum::{
    http::{header, HeaderName},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Headers that keep collector responses out of every cache.
pub const NO_CACHE_HEADERS: [(HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "Fri, 01 Jan 1990 00:00:00 GMT"),
];

/// Creates the collector router.
pub fn router(state: AppState) -> Router {
    // Beacons are sent from any site
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/beacon/catcher",
            get(beacon::catcher_handler).post(beacon::catcher_handler),
        )
        .route(
            "/hostnames",
            post(hostnames::register_handler).delete(hostnames::delete_handler),
        )
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
