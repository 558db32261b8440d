//! Beacon and subscription fixtures.

use chrono::{Duration, Utc};
use collector_core::{Subscription, SubscriptionWithHostname};

pub const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Query parameters of a page-visit beacon for `host`.
pub fn beacon_params(host: &str, subscription_id: &str) -> Vec<(String, String)> {
    vec![
        ("u".to_string(), format!("https://{host}/products?id=7")),
        ("subscription_id".to_string(), subscription_id.to_string()),
        ("v".to_string(), "1.737.0".to_string()),
        ("rt.si".to_string(), "session-1".to_string()),
        ("pid".to_string(), "page-1".to_string()),
        ("nt_dns_st".to_string(), "10".to_string()),
        ("nt_dns_end".to_string(), "30".to_string()),
        ("scr.xy".to_string(), "1920x1080".to_string()),
    ]
}

/// Subscription for `host` that is valid for another day.
pub fn active_subscription(id: &str, host: &str) -> SubscriptionWithHostname {
    SubscriptionWithHostname::new(Subscription::new(id, Utc::now() + Duration::days(1)), host)
}

/// Subscription for `host` that expired an hour ago.
pub fn expired_subscription(id: &str, host: &str) -> SubscriptionWithHostname {
    SubscriptionWithHostname::new(Subscription::new(id, Utc::now() - Duration::hours(1)), host)
}
