//! Event routing for the beacon collector.
//!
//! - Processor (channel-fed single consumer: lookup, persist or archive)
//! - Subscription lookups (cache-aside, or disabled)
//! - Enrichment (beacon flattening and user agent parsing)
//! - Shutdown (compaction stop, queue drain, backup flush)

pub mod enrichment;
pub mod processor;
pub mod shutdown;
pub mod subscription;

pub use enrichment::{BeaconRumEventFactory, RumEventFactory};
pub use processor::*;
pub use shutdown::drain;
pub use subscription::{CachingSubscriptionService, DisabledSubscriptionService, SubscriptionService};
