//! Subscription types and the tri-state lookup result.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Months a newly registered hostname stays subscribed.
pub const TRIAL_MONTHS: u32 = 3;

/// A subscription is valid until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            expires_at,
        }
    }

    /// Whether the subscription is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Trial subscription issued at `now`.
    ///
    /// The id is the expiry date followed by a random UUID:
    /// `2024-04-02|5f0c...`.
    pub fn trial(now: DateTime<Utc>) -> Self {
        let expires_at = now
            .checked_add_months(Months::new(TRIAL_MONTHS))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let id = format!("{}|{}", expires_at.format("%Y-%m-%d"), Uuid::new_v4());
        Self::new(id, expires_at)
    }
}

/// A hostname registered by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerHostname {
    pub username: String,
    pub hostname: String,
    pub subscription: Subscription,
}

impl OwnerHostname {
    pub fn new(
        username: impl Into<String>,
        hostname: impl Into<String>,
        subscription: Subscription,
    ) -> Self {
        Self {
            username: username.into(),
            hostname: hostname.into(),
            subscription,
        }
    }
}

/// A subscription together with the hostname it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionWithHostname {
    pub subscription: Subscription,
    pub hostname: String,
}

impl SubscriptionWithHostname {
    pub fn new(subscription: Subscription, hostname: impl Into<String>) -> Self {
        Self {
            subscription,
            hostname: hostname.into(),
        }
    }

    /// Classifies this subscription for `hostname` at `now`.
    ///
    /// Expiry wins over a hostname mismatch.
    pub fn lookup_at(&self, hostname: &str, now: DateTime<Utc>) -> Lookup {
        if self.subscription.is_expired_at(now) {
            Lookup::Expired
        } else if self.hostname != hostname {
            Lookup::NotFound
        } else {
            Lookup::Found
        }
    }
}

/// Outcome of a subscription lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lookup {
    /// Subscription exists, is unexpired, and matches the hostname
    Found,
    /// Subscription exists but is past its expiry
    Expired,
    /// No subscription for the id, or hostname mismatch
    NotFound,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "FOUND",
            Self::Expired => "EXPIRED",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
