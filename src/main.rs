//! Beacon Collector
//!
//! Receives web-performance beacons and:
//! - persists events whose subscription is valid to ClickHouse
//! - archives events with expired or unknown subscriptions as JSON lines
//! - compacts each day of archived lines into one file per host

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info};

use api::{router, AppState};
use backup::BackupConfig;
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseDao};
use collector_core::DataAccess;
use telemetry::{init_tracing_from_env, metrics};
use worker::{
    BeaconRumEventFactory, CachingSubscriptionService, DisabledSubscriptionService,
    EventProcessor, EventSink, ProcessorConfig, ProcessorDeps,
    SubscriptionService,
};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8087
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Private API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ApiConfig {
    /// Shared `X-Token` of the hostname API; empty disables it
    #[serde(default)]
    private_api_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubscriptionConfig {
    /// When off, every subscription lookup is `Found`
    #[serde(default = "default_true")]
    enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default)]
    server: ServerConfig,

    #[serde(default)]
    api: ApiConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    subscription: SubscriptionConfig,

    #[serde(default)]
    processor: ProcessorConfig,

    #[serde(default)]
    backup: BackupConfig,

    #[serde(default = "default_shutdown_timeout_secs")]
    shutdown_timeout_secs: u64,

    #[serde(default = "default_metrics_log_interval_secs")]
    metrics_log_interval_secs: u64,
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_metrics_log_interval_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            subscription: SubscriptionConfig::default(),
            processor: ProcessorConfig::default(),
            backup: BackupConfig::default(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            metrics_log_interval_secs: default_metrics_log_interval_secs(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Beacon Collector v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    // ClickHouse
    let clickhouse = ClickHouseClient::new(config.clickhouse.clone());
    if let Err(e) = clickhouse_client::health::init_schema(&clickhouse).await {
        error!("Failed to initialize ClickHouse schema: {}", e);
        // Continue anyway - the tables might already exist
    }
    if clickhouse_client::health::check_connection(&clickhouse).await {
        info!("ClickHouse connection: healthy");
    } else {
        error!("ClickHouse connection: unhealthy");
    }
    let dao: Arc<dyn DataAccess> = Arc::new(ClickHouseDao::new(clickhouse));

    // Backup
    let backup = backup::new(&config.backup).context("Failed to start backup")?;

    // Event processor
    let subscriptions: Box<dyn SubscriptionService> = if config.subscription.enabled {
        Box::new(CachingSubscriptionService::new(dao.clone()))
    } else {
        info!("Subscription checks disabled");
        Box::new(DisabledSubscriptionService)
    };
    let processor = EventProcessor::start(
        config.processor.clone().with_backup_enabled(config.backup.enabled),
        ProcessorDeps {
            dao: dao.clone(),
            backup: backup.clone(),
            subscriptions,
            factory: Arc::new(BeaconRumEventFactory::new()),
        },
    )
    .await
    .context("Failed to start event processor")?;

    let metrics_task =
        spawn_metrics_logger(Duration::from_secs(config.metrics_log_interval_secs.max(1)));

    // HTTP server
    if config.api.private_api_token.is_empty() {
        info!("Hostname API disabled, no private API token configured");
    }
    let state = AppState::new(Arc::new(processor.clone()) as Arc<dyn EventSink>)
        .with_hostname_api(dao, config.api.private_api_token.clone());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down...");
    metrics_task.abort();

    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(timeout, worker::drain(&processor, backup.as_ref())).await {
        Ok(Ok(())) => {
            info!(snapshot = ?metrics().snapshot(), "Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Shutdown failed");
            Err(e).context("Failed to drain pipeline")
        }
        Err(_) => {
            error!(timeout_secs = timeout.as_secs(), "Shutdown deadline exceeded");
            anyhow::bail!("shutdown did not finish within {}s", timeout.as_secs())
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. COLLECTOR__BACKUP__ENABLED
        .add_source(
            config::Environment::with_prefix("COLLECTOR")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Logs a metrics snapshot at a fixed interval.
fn spawn_metrics_logger(period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let snapshot = metrics().snapshot();
            info!(
                events_received = snapshot.events_received,
                queue_depth = snapshot.queue_depth,
                events_persisted = snapshot.events_persisted,
                events_expired = snapshot.events_expired,
                events_unknown = snapshot.events_unknown,
                lookup_errors = snapshot.lookup_errors,
                persist_errors = snapshot.persist_errors,
                backup_lines_written = snapshot.backup_lines_written,
                hosts_compacted = snapshot.hosts_compacted,
                compaction_failures = snapshot.compaction_failures,
                "Pipeline metrics"
            );
        }
    })
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
