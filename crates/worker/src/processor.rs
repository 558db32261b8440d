//! Event processor.
//!
//! A single task owns the subscription service and the per-window host map.
//! Callers hand events over an unbounded channel and never wait. Each event
//! is looked up and either persisted (`Found`) or archived in the expired or
//! unknown backup category. Once per interval the hosts seen since the last
//! tick are written as hostname events.

use backup::Backup;
use collector_core::{DataAccess, Event, HostnameEvent, Lookup, Result, RumEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use telemetry::metrics;

use crate::enrichment::RumEventFactory;
use crate::subscription::SubscriptionService;

/// Event processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Seconds between hostname activity writes
    #[serde(default = "default_host_flush_interval_secs")]
    pub host_flush_interval_secs: u64,
    /// Also archive every incoming event in the `archive` category.
    /// Unset follows whether backup is enabled.
    #[serde(default)]
    pub archive_all_events: Option<bool>,
}

fn default_host_flush_interval_secs() -> u64 {
    60
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            host_flush_interval_secs: default_host_flush_interval_secs(),
            archive_all_events: None,
        }
    }
}

impl ProcessorConfig {
    pub fn host_flush_interval(&self) -> Duration {
        Duration::from_secs(self.host_flush_interval_secs.max(1))
    }

    /// Fills an unset `archive_all_events` from the backup switch.
    pub fn with_backup_enabled(mut self, backup_enabled: bool) -> Self {
        self.archive_all_events.get_or_insert(backup_enabled);
        self
    }

    pub fn archives_all_events(&self) -> bool {
        self.archive_all_events.unwrap_or(false)
    }
}

/// Collaborators of the processor.
pub struct ProcessorDeps {
    pub dao: Arc<dyn DataAccess>,
    pub backup: Arc<dyn Backup>,
    pub subscriptions: Box<dyn SubscriptionService>,
    pub factory: Arc<dyn RumEventFactory>,
}

/// Accepts events without blocking.
pub trait EventSink: Send + Sync {
    fn save_async(&self, event: Event);
}

/// Handle to the running processor. Cheap to clone.
#[derive(Clone)]
pub struct EventProcessorHandle {
    tx: mpsc::UnboundedSender<Event>,
    shutdown: Arc<Notify>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EventProcessorHandle {
    /// Enqueues an event. A stopped processor drops it with a warning.
    pub fn save_async(&self, event: Event) {
        metrics().events_received.inc();
        if self.tx.send(event).is_err() {
            warn!("Event processor stopped, event dropped");
            return;
        }
        metrics().queue_depth.inc();
    }

    /// Stops intake, processes everything already queued, writes the pending
    /// hostname events, and waits for the task to finish.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.notify_one();
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| collector_core::Error::internal(format!("processor task failed: {e}")))?;
        }
        Ok(())
    }
}

impl EventSink for EventProcessorHandle {
    fn save_async(&self, event: Event) {
        EventProcessorHandle::save_async(self, event);
    }
}

/// The consumer side; owned by its task.
pub struct EventProcessor {
    config: ProcessorConfig,
    dao: Arc<dyn DataAccess>,
    backup: Arc<dyn Backup>,
    subscriptions: Box<dyn SubscriptionService>,
    factory: Arc<dyn RumEventFactory>,
    hosts: HashMap<String, String>,
}

impl EventProcessor {
    /// Loads the subscriptions, then spawns the consumer task.
    ///
    /// A failed load is returned and nothing is spawned.
    pub async fn start(config: ProcessorConfig, mut deps: ProcessorDeps) -> Result<EventProcessorHandle> {
        deps.subscriptions.load().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());
        let processor = Self {
            config,
            dao: deps.dao,
            backup: deps.backup,
            subscriptions: deps.subscriptions,
            factory: deps.factory,
            hosts: HashMap::new(),
        };
        let task = tokio::spawn(processor.run(rx, shutdown.clone()));

        Ok(EventProcessorHandle {
            tx,
            shutdown,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>, shutdown: Arc<Notify>) {
        let period = self.config.host_flush_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            host_flush_interval_secs = period.as_secs(),
            archive_all_events = self.config.archives_all_events(),
            "Event processor started"
        );

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.process(event).await,
                    None => break,
                },
                _ = ticker.tick() => self.flush_hosts().await,
                _ = shutdown.notified() => {
                    rx.close();
                    let mut drained = 0usize;
                    while let Some(event) = rx.recv().await {
                        self.process(event).await;
                        drained += 1;
                    }
                    info!(drained, "Event queue drained");
                    break;
                }
            }
        }

        self.flush_hosts().await;
        info!("Event processor stopped");
    }

    async fn process(&mut self, event: Event) {
        metrics().queue_depth.dec();

        if self.config.archives_all_events() {
            self.backup.save_async(&event);
        }

        let rum = self.factory.create(&event);
        let lookup = match self
            .subscriptions
            .get_subscription(&rum.subscription_id, &rum.hostname)
            .await
        {
            Ok(lookup) => lookup,
            Err(e) => {
                metrics().lookup_errors.inc();
                error!(
                    subscription_id = %rum.subscription_id,
                    hostname = %rum.hostname,
                    error = %e,
                    "Subscription lookup failed, event dropped"
                );
                return;
            }
        };

        debug!(
            subscription_id = %rum.subscription_id,
            hostname = %rum.hostname,
            lookup = %lookup,
            "Event routed"
        );

        match lookup {
            Lookup::Found => self.persist(rum).await,
            Lookup::Expired => {
                metrics().events_expired.inc();
                self.backup.save_expired(&event);
            }
            Lookup::NotFound => {
                metrics().events_unknown.inc();
                self.backup.save_unknown(&event);
            }
        }
    }

    // At most once: a failed save is neither retried nor archived.
    async fn persist(&mut self, rum: RumEvent) {
        match self.dao.save(&rum).await {
            Ok(()) => metrics().events_persisted.inc(),
            Err(e) => {
                metrics().persist_errors.inc();
                error!(hostname = %rum.hostname, error = %e, "Failed to persist event");
            }
        }
        self.hosts.insert(rum.hostname, rum.created_at);
    }

    async fn flush_hosts(&mut self) {
        let hosts = std::mem::take(&mut self.hosts);
        if hosts.is_empty() {
            return;
        }

        let count = hosts.len();
        for (hostname, updated_at) in hosts {
            let event = HostnameEvent::new(hostname, updated_at);
            match self.dao.save_host(&event).await {
                Ok(()) => metrics().hosts_saved.inc(),
                Err(e) => {
                    metrics().host_save_errors.inc();
                    error!(hostname = %event.hostname, error = %e, "Failed to save host");
                }
            }
        }
        debug!(hosts = count, "Host activity flushed");
    }
}
