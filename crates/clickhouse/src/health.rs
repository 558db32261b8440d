//! ClickHouse health checks.

use crate::client::ClickHouseClient;
use crate::schema::all_tables;
use collector_core::{DbErrorCode, Error, Result};
use telemetry::health;
use tracing::{debug, error, info};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            health().clickhouse.set_healthy();
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            health().clickhouse.set_unhealthy(e.to_string());
            false
        }
    }
}

/// Creates the collector tables when missing.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    for ddl in all_tables(&client.config().table_prefix) {
        client.inner().query(&ddl).execute().await.map_err(|e| {
            Error::database(
                DbErrorCode::ConnectionFailed,
                format!("Failed to execute DDL: {}", e),
            )
        })?;
    }

    info!(prefix = %client.config().table_prefix, "ClickHouse schema initialized");
    Ok(())
}
