//! Common test setup functions.

use api::{router, state::AppState};
use axum::Router;
use backup::{layout::CategoryLayout, Backup, BackupConfig, Category, FileBackup};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use worker::{
    BeaconRumEventFactory, CachingSubscriptionService, EventProcessor, EventProcessorHandle,
    EventSink, ProcessorConfig, ProcessorDeps, RumEventFactory,
};

use crate::mocks::{MockDao, RecordingSink};

/// The full pipeline: router, processor, mock DAO and a file backup in a
/// temporary directory.
///
/// Backup batches only flush on shutdown (the interval is an hour), so
/// tests observe files after [`TestContext::shutdown`].
pub struct TestContext {
    pub dao: Arc<MockDao>,
    pub backup: Arc<FileBackup>,
    pub processor: EventProcessorHandle,
    pub router: Router,
    pub backup_dir: TempDir,
}

impl TestContext {
    pub async fn new(dao: MockDao) -> Self {
        Self::with_config(dao, ProcessorConfig::default()).await
    }

    pub async fn with_config(dao: MockDao, config: ProcessorConfig) -> Self {
        Self::with_factory(dao, config, Arc::new(BeaconRumEventFactory::new())).await
    }

    pub async fn with_factory(
        dao: MockDao,
        config: ProcessorConfig,
        factory: Arc<dyn RumEventFactory>,
    ) -> Self {
        let backup_dir = TempDir::new().expect("Failed to create backup directory");
        let backup = Arc::new(
            FileBackup::start(&BackupConfig {
                enabled: true,
                directory: backup_dir.path().to_path_buf(),
                interval_secs: 3600,
                ..Default::default()
            })
            .expect("Failed to start file backup"),
        );

        let dao = Arc::new(dao);
        let processor = EventProcessor::start(
            config,
            ProcessorDeps {
                dao: dao.clone(),
                backup: backup.clone() as Arc<dyn Backup>,
                subscriptions: Box::new(CachingSubscriptionService::new(dao.clone())),
                factory,
            },
        )
        .await
        .expect("Failed to start event processor");

        let router = router(AppState::new(Arc::new(processor.clone()) as Arc<dyn EventSink>));

        Self {
            dao,
            backup,
            processor,
            router,
            backup_dir,
        }
    }

    /// Drains the processor, then writes every buffered backup line.
    pub async fn shutdown(&self) {
        self.drain().await.expect("Pipeline shutdown failed");
    }

    pub async fn drain(&self) -> collector_core::Result<()> {
        worker::drain(&self.processor, self.backup.as_ref()).await
    }

    pub fn layout(&self, category: Category) -> CategoryLayout {
        CategoryLayout::new(self.backup_dir.path().join(category.as_str()))
    }

    /// Every line written for `host` in `category`, across all hour files.
    pub fn backup_lines(&self, category: Category, host: &str) -> Vec<serde_json::Value> {
        let mut lines = Vec::new();
        collect_lines(&self.layout(category).host_dir(host), &mut lines);
        lines
    }
}

fn collect_lines(dir: &Path, out: &mut Vec<serde_json::Value>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_lines(&path, out);
        } else if path.to_string_lossy().ends_with(".json.lines") {
            let content = fs::read_to_string(&path).expect("Failed to read hour file");
            out.extend(
                content
                    .lines()
                    .map(|line| serde_json::from_str(line).expect("Invalid backup line")),
            );
        }
    }
}

/// Router with the hostname API enabled for `token` on top of `dao`.
pub fn hostname_router(dao: Arc<MockDao>, token: &str) -> Router {
    let sink = Arc::new(RecordingSink::new());
    router(
        AppState::new(sink as Arc<dyn EventSink>)
            .with_hostname_api(dao as Arc<dyn collector_core::DataAccess>, token),
    )
}

/// Router wired to a [`RecordingSink`] instead of the processor.
pub fn recording_router() -> (Arc<RecordingSink>, Router) {
    let sink = Arc::new(RecordingSink::new());
    let router = router(AppState::new(sink.clone() as Arc<dyn EventSink>));
    (sink, router)
}
