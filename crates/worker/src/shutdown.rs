//! Ordered pipeline shutdown.

use backup::Backup;
use collector_core::{Error, Result};
use tracing::{error, info};

use crate::processor::EventProcessorHandle;

/// Stops the daily compaction, drains the processor, then writes every
/// buffered backup line.
///
/// The backup is flushed even when the processor task failed; both failures
/// are reported in the returned error.
pub async fn drain(processor: &EventProcessorHandle, backup: &dyn Backup) -> Result<()> {
    backup.stop_compaction();

    let processed = processor.shutdown().await;
    if let Err(e) = &processed {
        error!(error = %e, "Event processor did not stop cleanly");
    }

    let flushed = backup.flush().await;
    if let Err(e) = &flushed {
        error!(error = %e, "Backup flush failed");
    }

    match (processed, flushed) {
        (Ok(()), Ok(())) => {
            info!("Pipeline drained");
            Ok(())
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), Err(b)) => Err(Error::internal(format!("backup flush failed: {b}"))),
        (Err(p), Err(b)) => Err(Error::internal(format!("{p}; backup flush failed: {b}"))),
    }
}
