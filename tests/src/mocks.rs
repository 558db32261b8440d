//! Mock implementations for testing.

use async_trait::async_trait;
use collector_core::{
    DataAccess, DbErrorCode, Error, Event, HostnameEvent, OwnerHostname, Result, RumEvent,
    SubscriptionWithHostname,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use worker::{BeaconRumEventFactory, EventSink, RumEventFactory};

/// In-memory [`DataAccess`] that records every write.
///
/// Subscriptions registered with [`MockDao::add_subscription`] or through
/// `insert_owner_hostname` are returned by both the bulk and the single
/// lookup.
#[derive(Default)]
pub struct MockDao {
    events: Mutex<Vec<RumEvent>>,
    hosts: Mutex<Vec<HostnameEvent>>,
    subscriptions: Mutex<HashMap<String, SubscriptionWithHostname>>,
    owners: Mutex<Vec<OwnerHostname>>,
    fail_saves: AtomicBool,
}

impl MockDao {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscription(&self, item: SubscriptionWithHostname) {
        self.subscriptions
            .lock()
            .insert(item.subscription.id.clone(), item);
    }

    /// Makes every `save` fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn saved_events(&self) -> Vec<RumEvent> {
        self.events.lock().clone()
    }

    pub fn saved_hosts(&self) -> Vec<HostnameEvent> {
        self.hosts.lock().clone()
    }

    pub fn owner_hostnames(&self) -> Vec<OwnerHostname> {
        self.owners.lock().clone()
    }
}

#[async_trait]
impl DataAccess for MockDao {
    async fn save(&self, event: &RumEvent) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::database(DbErrorCode::StoreFailed, "Mock save failure"));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn save_host(&self, event: &HostnameEvent) -> Result<()> {
        self.hosts.lock().push(event.clone());
        Ok(())
    }

    async fn get_subscriptions(&self) -> Result<HashMap<String, SubscriptionWithHostname>> {
        Ok(self.subscriptions.lock().clone())
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionWithHostname>> {
        Ok(self.subscriptions.lock().get(id).cloned())
    }

    async fn insert_owner_hostname(&self, owner: &OwnerHostname) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::database(DbErrorCode::StoreFailed, "Mock save failure"));
        }
        self.delete_owner_hostname(&owner.hostname, &owner.username).await?;
        self.add_subscription(SubscriptionWithHostname::new(
            owner.subscription.clone(),
            owner.hostname.clone(),
        ));
        self.owners.lock().push(owner.clone());
        Ok(())
    }

    async fn delete_owner_hostname(&self, hostname: &str, username: &str) -> Result<()> {
        let mut owners = self.owners.lock();
        let mut subscriptions = self.subscriptions.lock();
        owners.retain(|o| {
            let matches = o.hostname == hostname && o.username == username;
            if matches {
                subscriptions.remove(&o.subscription.id);
            }
            !matches
        });
        Ok(())
    }
}

/// Beacon factory that panics on one subscription id.
pub struct ExplodingFactory {
    trigger: String,
    inner: BeaconRumEventFactory,
}

impl ExplodingFactory {
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            inner: BeaconRumEventFactory::new(),
        }
    }
}

impl RumEventFactory for ExplodingFactory {
    fn create(&self, event: &Event) -> RumEvent {
        if event.param("subscription_id") == Some(self.trigger.as_str()) {
            panic!("factory exploded on {}", self.trigger);
        }
        self.inner.create(event)
    }
}

/// [`EventSink`] that keeps what it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn save_async(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use collector_core::Subscription;

    #[tokio::test]
    async fn test_mock_dao_subscriptions() {
        let dao = MockDao::new();
        dao.add_subscription(SubscriptionWithHostname::new(
            Subscription::new("s1", Utc::now()),
            "a.io",
        ));

        assert_eq!(dao.get_subscriptions().await.unwrap().len(), 1);
        assert!(dao.get_subscription("s1").await.unwrap().is_some());
        assert!(dao.get_subscription("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_dao_failure_mode() {
        let dao = MockDao::new();
        dao.set_fail_saves(true);
        assert!(dao.save(&RumEvent::default()).await.is_err());
        dao.set_fail_saves(false);
        dao.save(&RumEvent::default()).await.unwrap();
        assert_eq!(dao.saved_events().len(), 1);
    }
}
