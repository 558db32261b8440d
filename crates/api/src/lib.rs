//! HTTP layer for the beacon collector.

pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use response::ApiError;
pub use state::{AppState, HostnameApi};
