//! File backup for beacon events.
//!
//! Events that are not persisted (expired or unknown subscriptions, and
//! optionally every event) are appended as JSON lines to hourly files and
//! compacted once a day into a day archive plus a line-range summary.
//!
//! When backup is disabled the [`NullBackup`] takes its place, so callers
//! never check whether backup is on.

pub mod archive;
pub mod batch;
pub mod compression;
pub mod config;
pub mod error;
pub mod layout;
pub mod scheduler;
pub mod single;

pub use archive::{ArchiveError, CompactionReport, HostOutcome};
pub use batch::{BatchConfig, BatchWindow};
pub use compression::{Compression, CompressionLevel, CompressionStrategy, WriteCloser};
pub use config::BackupConfig;
pub use error::{BackupError, Result};
pub use single::{Category, SingleCategoryBackup};

use async_trait::async_trait;
use chrono::NaiveDate;
use collector_core::Event;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Destination for events that are archived rather than persisted.
#[async_trait]
pub trait Backup: Send + Sync {
    /// Archives an event in the `archive` category.
    fn save_async(&self, event: &Event);

    /// Archives an event whose subscription has expired.
    fn save_expired(&self, event: &Event);

    /// Archives an event with no matching subscription.
    fn save_unknown(&self, event: &Event);

    /// Cancels the daily compaction. Buffered events are kept.
    fn stop_compaction(&self);

    /// Stops the daily compaction and writes every buffered event.
    async fn flush(&self) -> Result<()>;
}

/// Builds the backup selected by `config`.
///
/// Fails when a category directory cannot be created.
pub fn new(config: &BackupConfig) -> Result<Arc<dyn Backup>> {
    if !config.enabled {
        info!("Backup disabled");
        telemetry::health().backup.set_healthy();
        return Ok(Arc::new(NullBackup));
    }
    Ok(Arc::new(FileBackup::start(config)?))
}

/// Backup that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackup;

#[async_trait]
impl Backup for NullBackup {
    fn save_async(&self, _event: &Event) {}

    fn save_expired(&self, _event: &Event) {}

    fn save_unknown(&self, _event: &Event) {}

    fn stop_compaction(&self) {}

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Backup on the local file system: three categories and a daily compaction.
pub struct FileBackup {
    archive: SingleCategoryBackup,
    expired: SingleCategoryBackup,
    unknown: SingleCategoryBackup,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl FileBackup {
    /// Creates the category directories, spawns their writers and schedules
    /// the daily compaction.
    pub fn start(config: &BackupConfig) -> Result<Self> {
        let strategy = config.compression_strategy();
        let batch = BatchConfig {
            max_size: config.max_batch_size,
            max_age: config.interval(),
        };

        let spawn = |category| {
            SingleCategoryBackup::spawn(category, &config.directory, batch.clone(), strategy)
        };
        let archive = spawn(Category::Archive)?;
        let expired = spawn(Category::Expired)?;
        let unknown = spawn(Category::Unknown)?;

        let scheduler = scheduler::spawn_daily(
            config.compaction_hour_utc,
            vec![archive.clone(), expired.clone(), unknown.clone()],
        );

        telemetry::health().backup.set_healthy();
        info!(
            directory = %config.directory.display(),
            compression = ?strategy,
            interval_secs = config.interval_secs,
            "File backup started"
        );

        Ok(Self {
            archive,
            expired,
            unknown,
            scheduler: Mutex::new(Some(scheduler)),
        })
    }

    pub fn categories(&self) -> [&SingleCategoryBackup; 3] {
        [&self.archive, &self.expired, &self.unknown]
    }

    /// Compacts `day` in every category, one after another.
    pub async fn compress_day(&self, day: NaiveDate) -> Vec<(Category, Result<CompactionReport>)> {
        let mut results = Vec::with_capacity(3);
        for backup in self.categories() {
            results.push((backup.category(), backup.compress_day(day).await));
        }
        results
    }

    fn stop_scheduler(&self) {
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
            info!("Daily compaction stopped");
        }
    }
}

#[async_trait]
impl Backup for FileBackup {
    fn save_async(&self, event: &Event) {
        self.archive.save_async(event);
    }

    fn save_expired(&self, event: &Event) {
        self.expired.save_async(event);
    }

    fn save_unknown(&self, event: &Event) {
        self.unknown.save_async(event);
    }

    fn stop_compaction(&self) {
        self.stop_scheduler();
    }

    async fn flush(&self) -> Result<()> {
        self.stop_scheduler();

        let mut first_error = None;
        for backup in self.categories() {
            if let Err(e) = backup.flush().await {
                warn!(category = backup.category().as_str(), error = %e, "Backup flush failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for FileBackup {
    fn drop(&mut self) {
        self.stop_scheduler();
    }
}
