//! Data access seam between the pipeline and the analytical store.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::events::{HostnameEvent, RumEvent};
use crate::subscription::{OwnerHostname, SubscriptionWithHostname};

/// Storage for RUM events, host activity and subscriptions.
///
/// ClickHouse in production, in-memory mocks in tests.
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Persists one RUM event.
    async fn save(&self, event: &RumEvent) -> Result<()>;

    /// Records that a hostname was active.
    async fn save_host(&self, event: &HostnameEvent) -> Result<()>;

    /// Fetches every subscription, keyed by subscription id.
    async fn get_subscriptions(&self) -> Result<HashMap<String, SubscriptionWithHostname>>;

    /// Fetches one subscription by id; `None` when it does not exist.
    async fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionWithHostname>>;

    /// Registers a hostname for its owner. Registering the same hostname
    /// and owner again replaces the subscription.
    async fn insert_owner_hostname(&self, owner: &OwnerHostname) -> Result<()>;

    /// Removes the registration of `hostname` by `username`.
    async fn delete_owner_hostname(&self, hostname: &str, username: &str) -> Result<()>;
}
