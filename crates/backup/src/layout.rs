//! On-disk layout of a backup category.
//!
//! ```text
//! <root>/<category>/<host>/<Y-M-D>/<hour>.json.lines   live hourly files
//! <root>/<category>/<host>/<Y-M-D>.json.lines[.ext]    day archive
//! <root>/<category>/<host>/<Y-M-D>.meta.lines          day summary
//! ```
//!
//! Date components are not zero-padded (`2023-9-5`).

use chrono::{Datelike, NaiveDate};
use collector_core::Event;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::compression::CompressionStrategy;

const LINES_SUFFIX: &str = ".json.lines";
const META_SUFFIX: &str = ".meta.lines";

/// Host directory used when the beacon's `u` parameter has no hostname.
pub const UNKNOWN_HOST: &str = "_unknown_host";

/// Paths inside one category directory.
#[derive(Debug, Clone)]
pub struct CategoryLayout {
    root: PathBuf,
}

impl CategoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn host_dir(&self, host: &str) -> PathBuf {
        self.root.join(host)
    }

    /// Directory holding the hourly files of `host` for `day`.
    pub fn day_dir(&self, host: &str, day: NaiveDate) -> PathBuf {
        self.host_dir(host).join(date_name(day))
    }

    pub fn hour_file(&self, host: &str, day: NaiveDate, hour: u32) -> PathBuf {
        self.day_dir(host, day).join(hour_file_name(hour))
    }

    pub fn day_archive(&self, host: &str, day: NaiveDate, strategy: CompressionStrategy) -> PathBuf {
        let name = format!("{}{LINES_SUFFIX}", date_name(day));
        self.host_dir(host).join(strategy.filename(&name))
    }

    pub fn day_summary(&self, host: &str, day: NaiveDate) -> PathBuf {
        self.host_dir(host)
            .join(format!("{}{META_SUFFIX}", date_name(day)))
    }
}

/// `Y-M-D` without zero padding.
pub fn date_name(day: NaiveDate) -> String {
    format!("{}-{}-{}", day.year(), day.month(), day.day())
}

pub fn hour_file_name(hour: u32) -> String {
    format!("{hour}{LINES_SUFFIX}")
}

/// Host directory key for an event: the hostname of its `u` parameter with
/// dots replaced by underscores.
pub fn host_key(event: &Event) -> String {
    event
        .param("u")
        .and_then(|u| url::Url::parse(u).ok())
        .and_then(|u| u.host_str().map(|h| h.replace('.', "_")))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// One archived line: the first value of every parameter plus a
/// `request_headers` field holding the request headers as JSON.
pub fn archive_line(event: &Event) -> serde_json::Result<String> {
    let mut flat: BTreeMap<&str, String> = event
        .request_parameters
        .iter()
        .filter_map(|(k, v)| v.first().map(|first| (k.as_str(), first.clone())))
        .collect();
    flat.insert("request_headers", serde_json::to_string(&event.headers)?);
    serde_json::to_string(&flat)
}
