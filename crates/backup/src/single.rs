//! One backup category.
//!
//! A single writer task owns the batch window and the category's directory
//! tree. Batch writes and compactions both run through it, so a flush can
//! never race the removal of an hourly directory.

use chrono::{Duration as ChronoDuration, NaiveDate, Timelike, Utc};
use collector_core::Event;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::future::pending;
use std::io::{self, Write};
use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use telemetry::{health, metrics};

use crate::archive::{archive_day, CompactionReport};
use crate::batch::{BatchConfig, BatchWindow};
use crate::compression::CompressionStrategy;
use crate::error::{BackupError, Result};
use crate::layout::{archive_line, host_key, CategoryLayout};

/// The fixed backup categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Every event, when archive-all is on
    Archive,
    /// Events whose subscription has expired
    Expired,
    /// Events with no matching subscription
    Unknown,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Archive, Self::Expired, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

/// A line waiting in the batch window, already keyed by host directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLine {
    pub host: String,
    pub line: String,
}

impl ArchiveLine {
    pub fn from_event(event: &Event) -> serde_json::Result<Self> {
        Ok(Self {
            host: host_key(event),
            line: archive_line(event)?,
        })
    }
}

enum Command {
    Save(ArchiveLine),
    Flush(oneshot::Sender<Result<()>>),
    Compress(NaiveDate, oneshot::Sender<Result<CompactionReport>>),
}

/// Handle to one category's writer task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SingleCategoryBackup {
    category: Category,
    tx: mpsc::UnboundedSender<Command>,
}

impl SingleCategoryBackup {
    /// Creates `<root>/<category>` and spawns the writer task.
    pub fn spawn(
        category: Category,
        root: &Path,
        batch: BatchConfig,
        strategy: CompressionStrategy,
    ) -> Result<Self> {
        let dir = root.join(category.as_str());
        fs::create_dir_all(&dir).map_err(|source| BackupError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = Writer {
            category,
            layout: CategoryLayout::new(dir),
            window: BatchWindow::new(batch),
            strategy,
            in_flight: None,
        };
        tokio::spawn(writer.run(rx));

        Ok(Self { category, tx })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Queues an event for the next batch without waiting.
    pub fn save_async(&self, event: &Event) {
        let line = match ArchiveLine::from_event(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(category = self.category.as_str(), error = %e, "Failed to serialize event for backup");
                metrics().backup_write_errors.inc();
                return;
            }
        };
        if self.tx.send(Command::Save(line)).is_err() {
            warn!(category = self.category.as_str(), "Backup writer stopped, event dropped");
        }
    }

    /// Writes whatever is buffered and waits for it to reach disk.
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Flush(ack))?;
        done.await.map_err(|_| self.stopped())?
    }

    /// Compacts the previous UTC day.
    pub async fn compress(&self) -> Result<CompactionReport> {
        let day = (Utc::now() - ChronoDuration::days(1)).date_naive();
        self.compress_day(day).await
    }

    /// Compacts `day` for every host of this category.
    pub async fn compress_day(&self, day: NaiveDate) -> Result<CompactionReport> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Compress(day, ack))?;
        done.await.map_err(|_| self.stopped())?
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| self.stopped())
    }

    fn stopped(&self) -> BackupError {
        BackupError::WriterStopped {
            category: self.category.as_str(),
        }
    }
}

#[derive(Debug, Default)]
struct FlushOutcome {
    lines_written: usize,
    failed_hosts: usize,
}

struct Writer {
    category: Category,
    layout: CategoryLayout,
    window: BatchWindow<ArchiveLine>,
    strategy: CompressionStrategy,
    in_flight: Option<JoinHandle<FlushOutcome>>,
}

impl Writer {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        debug!(category = self.category.as_str(), "Backup writer started");

        loop {
            let deadline = match self.in_flight {
                Some(_) => None,
                None => self.window.deadline(),
            };

            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Save(line)) => {
                        if self.window.push(line) {
                            self.start_flush();
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        let _ = ack.send(self.flush_now().await);
                    }
                    Some(Command::Compress(day, ack)) => {
                        let _ = ack.send(self.compact(day).await);
                    }
                    None => {
                        if let Err(e) = self.flush_now().await {
                            error!(category = self.category.as_str(), error = %e, "Final backup flush failed");
                        }
                        break;
                    }
                },
                _ = wait_until(deadline) => self.start_flush(),
                joined = join_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    if let Err(e) = self.complete(joined) {
                        warn!(category = self.category.as_str(), error = %e, "Backup batch failed");
                    }
                    if self.window.is_due(Instant::now()) {
                        self.start_flush();
                    }
                }
            }
        }

        debug!(category = self.category.as_str(), "Backup writer stopped");
    }

    /// Hands the buffered batch to a blocking task; no-op while one is in flight.
    fn start_flush(&mut self) {
        if let Some(batch) = self.window.begin_flush() {
            let layout = self.layout.clone();
            let category = self.category;
            self.in_flight = Some(spawn_blocking(move || write_batch(category, &layout, batch)));
        }
    }

    /// Waits for the in-flight batch, then writes the rest synchronously.
    async fn flush_now(&mut self) -> Result<()> {
        let mut result = self.settle().await;
        if let Some(batch) = self.window.begin_flush() {
            let layout = self.layout.clone();
            let category = self.category;
            let joined = spawn_blocking(move || write_batch(category, &layout, batch)).await;
            result = result.and(self.complete(joined));
        }
        result
    }

    async fn settle(&mut self) -> Result<()> {
        match self.in_flight.take() {
            Some(handle) => {
                let joined = handle.await;
                self.complete(joined)
            }
            None => Ok(()),
        }
    }

    fn complete(
        &mut self,
        joined: std::result::Result<FlushOutcome, tokio::task::JoinError>,
    ) -> Result<()> {
        self.window.finish_flush();
        let outcome = joined.map_err(|e| BackupError::Task(e.to_string()))?;

        metrics().backup_lines_written.inc_by(outcome.lines_written as u64);
        if outcome.failed_hosts > 0 {
            metrics().backup_write_errors.inc_by(outcome.failed_hosts as u64);
            health().backup.set_unhealthy(format!(
                "{} batch write failed on {} host(s)",
                self.category.as_str(),
                outcome.failed_hosts
            ));
            return Err(BackupError::Write {
                category: self.category.as_str(),
                failed_hosts: outcome.failed_hosts,
            });
        }
        health().backup.set_healthy();
        Ok(())
    }

    async fn compact(&mut self, day: NaiveDate) -> Result<CompactionReport> {
        if let Err(e) = self.settle().await {
            warn!(category = self.category.as_str(), error = %e, "Pending batch failed before compaction");
        }

        let start = std::time::Instant::now();
        let layout = self.layout.clone();
        let strategy = self.strategy;
        let report = spawn_blocking(move || archive_day(&layout, day, strategy))
            .await
            .map_err(|e| BackupError::Task(e.to_string()))??;

        let elapsed = start.elapsed();
        metrics().compaction_latency_ms.observe(elapsed.as_millis() as u64);
        metrics().hosts_compacted.inc_by(report.archived.len() as u64);
        metrics().compaction_failures.inc_by(report.failed.len() as u64);

        info!(
            category = self.category.as_str(),
            day = %day,
            archived = report.archived.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            latency_ms = %elapsed.as_millis(),
            "Compaction finished"
        );
        Ok(report)
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn join_in_flight(
    in_flight: &mut Option<JoinHandle<FlushOutcome>>,
) -> std::result::Result<FlushOutcome, tokio::task::JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => pending().await,
    }
}

/// Appends a batch to the current hour's file of each host, in batch order.
fn write_batch(category: Category, layout: &CategoryLayout, batch: Vec<ArchiveLine>) -> FlushOutcome {
    let start = std::time::Instant::now();
    let now = Utc::now();
    let day = now.date_naive();
    let hour = now.hour();

    let mut by_host: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for item in batch {
        let (text, count) = by_host.entry(item.host).or_default();
        text.push_str(&item.line);
        text.push('\n');
        *count += 1;
    }

    let mut outcome = FlushOutcome::default();
    for (host, (text, count)) in by_host {
        let path = layout.hour_file(&host, day, hour);
        match append(&path, text.as_bytes()) {
            Ok(()) => outcome.lines_written += count,
            Err(e) => {
                error!(
                    category = category.as_str(),
                    path = %path.display(),
                    lines = count,
                    error = %e,
                    "Failed to append backup lines"
                );
                outcome.failed_hosts += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    metrics().backup_flush_latency_ms.observe(elapsed.as_millis() as u64);
    debug!(
        category = category.as_str(),
        lines = outcome.lines_written,
        latency_ms = %elapsed.as_millis(),
        "Backup batch written"
    );
    outcome
}

fn append(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)
}
