//! Costhouse Server Binary
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL URL (default: local costhouse database)
//! - `SERVER_ADDRESS`: HTTP bind address (default: 0.0.0.0:8080)
//! - `POD_LABEL_KEYS`: comma-separated label allow-list (default: label_rht_comp)
//! - `PARTITION_PROVISION_DAYS`: forward partition window (default: 90)
//! - `PARTITION_BACKFILL_DAYS`: backward partition window (default: 0)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use costhouse_api::{create_router, serve, AppState, Config, MaintenanceConfig, PartitionMaintenance};
use costhouse_ingest::LabelPolicy;
use costhouse_store::{MetricsStore, PostgresMetricsStore};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🚀 costhouse server starting...");

    let config = Config::from_env();
    info!("Configuration:");
    info!("  Server address: {}", config.server_address);
    info!("  Database: {}", config.database_url);
    info!("  Pod label keys: {}", config.pod_label_keys);

    info!("Connecting to store...");
    let store = PostgresMetricsStore::new(&config.database_url).await?;
    let pool = store.pool().clone();
    info!("✓ Store connected, migrations applied");

    let maintenance = Arc::new(PartitionMaintenance::new(
        pool,
        MaintenanceConfig {
            tick_interval: Duration::from_secs(24 * 60 * 60),
            provision_days: config.provision_days,
            backfill_days: config.backfill_days,
        },
    ));

    // Provision the initial window before accepting traffic, then keep the
    // window moving on a daily tick.
    maintenance.run_once().await?;
    info!("✓ Partition window provisioned");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let maintenance_handle = maintenance.clone().start(shutdown_rx);

    let policy = LabelPolicy::new(&config.pod_label_keys);
    let store: Arc<dyn MetricsStore> = Arc::new(store);
    let state = AppState {
        store,
        policy: Arc::new(policy),
    };

    let router = create_router(state);
    serve(router, &config.server_address).await?;

    let _ = shutdown_tx.send(());
    let _ = maintenance_handle.await;

    Ok(())
}
