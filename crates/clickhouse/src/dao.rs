//! [`DataAccess`] backed by ClickHouse.

use crate::client::ClickHouseClient;
use crate::insert::{insert_hostname, insert_owner_hostname, insert_rum_event};
use crate::query::{delete_owner_hostname, fetch_subscription, fetch_subscriptions};
use async_trait::async_trait;
use collector_core::{
    DataAccess, HostnameEvent, OwnerHostname, Result, RumEvent, SubscriptionWithHostname,
};
use std::collections::HashMap;

/// ClickHouse data access; every call is one HTTP round trip.
#[derive(Clone)]
pub struct ClickHouseDao {
    client: ClickHouseClient,
}

impl ClickHouseDao {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

#[async_trait]
impl DataAccess for ClickHouseDao {
    async fn save(&self, event: &RumEvent) -> Result<()> {
        insert_rum_event(&self.client, event).await
    }

    async fn save_host(&self, event: &HostnameEvent) -> Result<()> {
        insert_hostname(&self.client, event).await
    }

    async fn get_subscriptions(&self) -> Result<HashMap<String, SubscriptionWithHostname>> {
        fetch_subscriptions(&self.client).await
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionWithHostname>> {
        fetch_subscription(&self.client, id).await
    }

    async fn insert_owner_hostname(&self, owner: &OwnerHostname) -> Result<()> {
        insert_owner_hostname(&self.client, owner).await
    }

    async fn delete_owner_hostname(&self, hostname: &str, username: &str) -> Result<()> {
        delete_owner_hostname(&self.client, hostname, username).await
    }
}
