//! Internal telemetry for the beacon collector.
//!
//! Structured logging through `tracing`, in-process pipeline counters,
//! and a component health registry.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
