//! Internal metrics collection.
//!
//! Counters live in-memory and are logged periodically by the binary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements, saturating at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the collector.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub events_received: Counter,
    pub queue_depth: Gauge,

    // Routing outcomes
    pub events_persisted: Counter,
    pub events_expired: Counter,
    pub events_unknown: Counter,
    pub lookup_errors: Counter,
    pub persist_errors: Counter,
    pub hosts_saved: Counter,
    pub host_save_errors: Counter,

    // ClickHouse
    pub clickhouse_inserts: Counter,
    pub clickhouse_errors: Counter,
    pub clickhouse_latency_ms: Histogram,

    // Backup
    pub backup_lines_written: Counter,
    pub backup_write_errors: Counter,
    pub backup_flush_latency_ms: Histogram,

    // Compaction
    pub hosts_compacted: Counter,
    pub compaction_failures: Counter,
    pub compaction_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_received: self.events_received.get(),
            queue_depth: self.queue_depth.get(),
            events_persisted: self.events_persisted.get(),
            events_expired: self.events_expired.get(),
            events_unknown: self.events_unknown.get(),
            lookup_errors: self.lookup_errors.get(),
            persist_errors: self.persist_errors.get(),
            hosts_saved: self.hosts_saved.get(),
            clickhouse_inserts: self.clickhouse_inserts.get(),
            clickhouse_errors: self.clickhouse_errors.get(),
            clickhouse_latency_mean_ms: self.clickhouse_latency_ms.mean(),
            backup_lines_written: self.backup_lines_written.get(),
            backup_write_errors: self.backup_write_errors.get(),
            backup_flush_latency_mean_ms: self.backup_flush_latency_ms.mean(),
            hosts_compacted: self.hosts_compacted.get(),
            compaction_failures: self.compaction_failures.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_received: u64,
    pub queue_depth: u64,
    pub events_persisted: u64,
    pub events_expired: u64,
    pub events_unknown: u64,
    pub lookup_errors: u64,
    pub persist_errors: u64,
    pub hosts_saved: u64,
    pub clickhouse_inserts: u64,
    pub clickhouse_errors: u64,
    pub clickhouse_latency_mean_ms: f64,
    pub backup_lines_written: u64,
    pub backup_write_errors: u64,
    pub backup_flush_latency_mean_ms: f64,
    pub hosts_compacted: u64,
    pub compaction_failures: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_buckets() {
        let h = Histogram::new();
        h.observe(3);
        h.observe(40);
        h.observe(60_000);

        assert_eq!(h.count(), 3);
        assert_eq!(h.sum(), 60_043);
        let buckets = h.buckets();
        assert_eq!(buckets[1], (5, 1));
        assert_eq!(buckets[4], (50, 1));
        assert_eq!(buckets[10], (10000, 1));
    }

    #[test]
    fn test_gauge_saturates_at_zero() {
        let g = Gauge::new();
        g.inc();
        g.dec();
        g.dec();
        assert_eq!(g.get(), 0);
    }

    #[test]
    fn test_snapshot_reads_counters() {
        let m = Metrics::new();
        m.events_received.inc_by(4);
        m.events_expired.inc();
        let snap = m.snapshot();
        assert_eq!(snap.events_received, 4);
        assert_eq!(snap.events_expired, 1);
        assert_eq!(snap.events_unknown, 0);
    }
}
