//! Application state shared across handlers.

use collector_core::DataAccess;
use std::sync::Arc;
use worker::EventSink;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Receives captured beacons (the event processor in production)
    pub sink: Arc<dyn EventSink>,
    /// Hostname registration; `None` rejects every call
    pub hostnames: Option<HostnameApi>,
}

/// Storage and shared token of the hostname API.
#[derive(Clone)]
pub struct HostnameApi {
    pub dao: Arc<dyn DataAccess>,
    pub token: String,
}

impl AppState {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            hostnames: None,
        }
    }

    /// Enables the hostname API. An empty token leaves it disabled.
    pub fn with_hostname_api(mut self, dao: Arc<dyn DataAccess>, token: impl Into<String>) -> Self {
        let token = token.into();
        self.hostnames = (!token.is_empty()).then_some(HostnameApi { dao, token });
        self
    }
}
