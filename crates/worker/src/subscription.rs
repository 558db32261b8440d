//! Subscription lookups for the event processor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use collector_core::{DataAccess, Lookup, Result, SubscriptionWithHostname};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Answers whether a subscription covers a hostname.
///
/// Methods take `&mut self`: the service lives inside the processor task and
/// is never shared.
#[async_trait]
pub trait SubscriptionService: Send {
    /// Bulk load at startup.
    async fn load(&mut self) -> Result<()>;

    async fn get_subscription(&mut self, id: &str, hostname: &str) -> Result<Lookup>;
}

/// Cache-aside subscription lookups.
///
/// Misses are fetched from the data access layer and cached when found.
/// Missing ids are not cached, so they are queried again on every lookup.
pub struct CachingSubscriptionService {
    dao: Arc<dyn DataAccess>,
    cache: HashMap<String, SubscriptionWithHostname>,
}

impl CachingSubscriptionService {
    pub fn new(dao: Arc<dyn DataAccess>) -> Self {
        Self {
            dao,
            cache: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Classifies `item` for `hostname` at `now`. Expiry is checked first.
    pub fn evaluate(item: &SubscriptionWithHostname, hostname: &str, now: DateTime<Utc>) -> Lookup {
        item.lookup_at(hostname, now)
    }
}

#[async_trait]
impl SubscriptionService for CachingSubscriptionService {
    async fn load(&mut self) -> Result<()> {
        self.cache = self.dao.get_subscriptions().await?;
        info!(subscriptions = self.cache.len(), "Subscription cache loaded");
        Ok(())
    }

    async fn get_subscription(&mut self, id: &str, hostname: &str) -> Result<Lookup> {
        if let Some(item) = self.cache.get(id) {
            return Ok(Self::evaluate(item, hostname, Utc::now()));
        }

        let Some(item) = self.dao.get_subscription(id).await? else {
            debug!(subscription_id = %id, "Subscription not found");
            return Ok(Lookup::NotFound);
        };

        let lookup = Self::evaluate(&item, hostname, Utc::now());
        self.cache.insert(id.to_string(), item);
        Ok(lookup)
    }
}

/// Every lookup is `Found`; used when subscription checks are turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSubscriptionService;

#[async_trait]
impl SubscriptionService for DisabledSubscriptionService {
    async fn load(&mut self) -> Result<()> {
        Ok(())
    }

    async fn get_subscription(&mut self, _id: &str, _hostname: &str) -> Result<Lookup> {
        Ok(Lookup::Found)
    }
}
