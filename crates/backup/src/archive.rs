//! Daily compaction of hourly files.
//!
//! For each host the 24 hourly files of a day are concatenated into one
//! (optionally compressed) day archive plus an uncompressed summary with one
//! `hour,start,end` row per non-empty hour. The hourly directory is removed
//! only after both files are written, so a failed run can be retried.

use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::compression::CompressionStrategy;
use crate::layout::{date_name, CategoryLayout};

/// Compaction failure, carrying the failing path.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot list category directory {}: {source}", .path.display())]
    ListHosts {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot inspect day directory {}: {source}", .path.display())]
    CheckSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("expected a directory at {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("cannot read hour file {}: {source}", .path.display())]
    ReadHour {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write day archive {}: {source}", .path.display())]
    WriteArchive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write day summary {}: {source}", .path.display())]
    WriteSummary {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of compacting one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOutcome {
    /// Archive and summary written; `lines` complete lines archived
    Archived { lines: usize },
    /// No hourly directory for that day
    Skipped,
}

/// Per-day compaction summary for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionReport {
    pub archived: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl CompactionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Concatenated hours of one day.
#[derive(Debug, Default)]
struct DayContent {
    bytes: Vec<u8>,
    summary: String,
    lines: usize,
}

enum Step {
    CheckSource,
    ReadHours,
    WriteArchive(DayContent),
    WriteSummary(DayContent),
    RemoveSource(usize),
    Done(usize),
    Skip,
}

/// Compacts `day` for every host directory of the category.
///
/// Per-host failures are logged and reported; the remaining hosts still run.
pub fn archive_day(
    layout: &CategoryLayout,
    day: NaiveDate,
    strategy: CompressionStrategy,
) -> Result<CompactionReport, ArchiveError> {
    let root = layout.root();
    let entries = fs::read_dir(root).map_err(|source| ArchiveError::ListHosts {
        path: root.to_path_buf(),
        source,
    })?;

    let mut hosts: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    hosts.sort();

    let mut report = CompactionReport::default();
    for host in hosts {
        match archive_host(layout, &host, day, strategy) {
            Ok(HostOutcome::Archived { lines }) => {
                info!(host = %host, day = %date_name(day), lines, "Host day archived");
                report.archived.push(host);
            }
            Ok(HostOutcome::Skipped) => report.skipped.push(host),
            Err(e) => {
                error!(host = %host, day = %date_name(day), error = %e, "Host day archive failed");
                report.failed.push(host);
            }
        }
    }

    Ok(report)
}

/// Compacts one host's day.
///
/// Any failure before the source directory is removed leaves it untouched.
pub fn archive_host(
    layout: &CategoryLayout,
    host: &str,
    day: NaiveDate,
    strategy: CompressionStrategy,
) -> Result<HostOutcome, ArchiveError> {
    let day_dir = layout.day_dir(host, day);
    let mut step = Step::CheckSource;

    loop {
        step = match step {
            Step::CheckSource => match fs::metadata(&day_dir) {
                Ok(meta) if meta.is_dir() => Step::ReadHours,
                Ok(_) => return Err(ArchiveError::NotADirectory { path: day_dir }),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Step::Skip,
                Err(source) => {
                    return Err(ArchiveError::CheckSource {
                        path: day_dir,
                        source,
                    })
                }
            },
            Step::ReadHours => Step::WriteArchive(read_hours(layout, host, day)?),
            Step::WriteArchive(content) => {
                let path = layout.day_archive(host, day, strategy);
                write_fresh(&path, &content.bytes, strategy)
                    .map_err(|source| ArchiveError::WriteArchive { path, source })?;
                Step::WriteSummary(content)
            }
            Step::WriteSummary(content) => {
                let path = layout.day_summary(host, day);
                write_fresh(&path, content.summary.as_bytes(), CompressionStrategy::None)
                    .map_err(|source| ArchiveError::WriteSummary { path, source })?;
                Step::RemoveSource(content.lines)
            }
            Step::RemoveSource(lines) => {
                // Archive and summary are durable; a leftover directory is harmless.
                if let Err(e) = fs::remove_dir_all(&day_dir) {
                    warn!(path = %day_dir.display(), error = %e, "Failed to remove hourly directory");
                }
                Step::Done(lines)
            }
            Step::Done(lines) => return Ok(HostOutcome::Archived { lines }),
            Step::Skip => {
                debug!(path = %day_dir.display(), "No hourly directory, skipping");
                return Ok(HostOutcome::Skipped);
            }
        };
    }
}

fn read_hours(layout: &CategoryLayout, host: &str, day: NaiveDate) -> Result<DayContent, ArchiveError> {
    let mut content = DayContent::default();

    for hour in 0..24 {
        let path = layout.hour_file(host, day, hour);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => return Err(ArchiveError::ReadHour { path, source }),
        };

        // A trailing partial line is archived but not counted.
        let lines = bytes.iter().filter(|&&b| b == b'\n').count();
        if lines > 0 {
            let _ = writeln!(
                content.summary,
                "{hour},{},{}",
                content.lines + 1,
                content.lines + lines
            );
            content.lines += lines;
        }
        content.bytes.extend_from_slice(&bytes);
    }

    Ok(content)
}

/// Writes `bytes` through `strategy` to a freshly created file, replacing any
/// existing one. The compressor is closed before the file.
fn write_fresh(path: &Path, bytes: &[u8], strategy: CompressionStrategy) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut writer = strategy.create(&mut file)?;
    writer.write_all(bytes)?;
    writer.close()?;
    file.sync_all()
}
