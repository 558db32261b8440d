//! Time and size windowed batching.
//!
//! A window opens with its first item and closes when it holds `max_size`
//! items or is `max_age` old, whichever comes first. At most one batch is in
//! flight; items pushed while a flush runs land in the next batch, in
//! submission order.

use std::time::Duration;
use tokio::time::Instant;

/// Batch window configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum batch size before flush
    pub max_size: usize,
    /// Maximum batch age before flush
    pub max_age: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            max_age: Duration::from_secs(5),
        }
    }
}

/// Buffer, window timer and flush-in-progress flag.
#[derive(Debug)]
pub struct BatchWindow<T> {
    config: BatchConfig,
    buffer: Vec<T>,
    opened_at: Option<Instant>,
    flushing: bool,
}

impl<T> BatchWindow<T> {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            opened_at: None,
            flushing: false,
        }
    }

    /// Buffers an item. Returns true when the window is full.
    pub fn push(&mut self, item: T) -> bool {
        if self.buffer.is_empty() {
            self.opened_at = Some(Instant::now());
        }
        self.buffer.push(item);
        self.is_full()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.config.max_size.max(1)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// When the current window closes on age; `None` when nothing is buffered.
    pub fn deadline(&self) -> Option<Instant> {
        self.opened_at.map(|opened| opened + self.config.max_age)
    }

    /// Whether the buffered items should be written now.
    pub fn is_due(&self, now: Instant) -> bool {
        self.is_full() || self.deadline().is_some_and(|deadline| deadline <= now)
    }

    /// Takes the buffered batch and marks a flush in flight.
    ///
    /// Returns `None` while another flush is in flight or nothing is buffered.
    pub fn begin_flush(&mut self) -> Option<Vec<T>> {
        if self.flushing || self.buffer.is_empty() {
            return None;
        }
        self.flushing = true;
        self.opened_at = None;
        Some(std::mem::take(&mut self.buffer))
    }

    /// Clears the in-flight flag. Items pushed meanwhile open a fresh window.
    pub fn finish_flush(&mut self) {
        self.flushing = false;
        if !self.buffer.is_empty() && self.opened_at.is_none() {
            self.opened_at = Some(Instant::now());
        }
    }
}
