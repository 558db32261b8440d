//! Backup configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::compression::{Compression, CompressionLevel, CompressionStrategy};

/// File backup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Whether events are archived on disk at all
    #[serde(default)]
    pub enabled: bool,
    /// Root directory holding the category directories
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Batch window in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Events buffered before a batch is written early
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Whether day archives are compressed
    #[serde(default)]
    pub compression_enabled: bool,
    /// Compression type (NONE, GZIP, Zstandard)
    #[serde(default = "default_compression")]
    pub compression: String,
    /// Compression level (No, BestSpeed, Default, BestCompression, HuffmanOnly)
    #[serde(default = "default_compression_level")]
    pub compression_level: String,
    /// UTC hour at which the previous day is compacted
    #[serde(default = "default_compaction_hour_utc")]
    pub compaction_hour_utc: u32,
}

fn default_directory() -> PathBuf {
    PathBuf::from("./backup")
}

fn default_interval_secs() -> u64 {
    5
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_compression() -> String {
    "NONE".to_string()
}

fn default_compression_level() -> String {
    "Default".to_string()
}

fn default_compaction_hour_utc() -> u32 {
    1
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_directory(),
            interval_secs: default_interval_secs(),
            max_batch_size: default_max_batch_size(),
            compression_enabled: false,
            compression: default_compression(),
            compression_level: default_compression_level(),
            compaction_hour_utc: default_compaction_hour_utc(),
        }
    }
}

impl BackupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Resolves the compression strategy used for day archives.
    pub fn compression_strategy(&self) -> CompressionStrategy {
        CompressionStrategy::new(
            self.compression_enabled,
            Compression::from_name(&self.compression),
            CompressionLevel::from_name(&self.compression_level),
        )
    }
}
