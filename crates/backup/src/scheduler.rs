//! Daily compaction trigger.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::single::SingleCategoryBackup;

/// Next `hour:00:00` UTC strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Spawns the task that compacts the previous day of every category once a
/// day at `hour` UTC. Categories run one after another; a slow run delays
/// the next tick rather than overlapping it.
pub fn spawn_daily(hour: u32, categories: Vec<SingleCategoryBackup>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, hour);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, "Daily compaction scheduled");
            tokio::time::sleep(wait).await;

            for backup in &categories {
                if let Err(e) = backup.compress().await {
                    error!(category = backup.category().as_str(), error = %e, "Daily compaction failed");
                }
            }
        }
    })
}
