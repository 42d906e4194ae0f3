//! Partition Maintenance Background Task
//!
//! Keeps the daily partition window of the hourly fact tables moving:
//!
//! 1. On startup and once per tick, provision partitions from
//!    `today - backfill_days` through `today + provision_days` on both
//!    `node_metrics` and `pod_metrics`.
//! 2. Once per tick, prune every day of the month preceding the current one,
//!    which bounds historical raw storage. Daily roll-ups are never pruned.
//!
//! Provisioning and pruning are both idempotent, so a missed or repeated tick
//! is harmless. Failures are logged and retried on the next tick; they never
//! fail ingestion directly, although an ingest write into a day that is
//! actually missing its partition will fail that row.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate, Utc};
use costhouse_store::PartitionManager;
use sqlx::PgPool;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Configuration for the maintenance task
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// How often to re-provision and prune (default: 24 hours)
    pub tick_interval: Duration,
    /// Days of partitions to keep provisioned ahead of today
    pub provision_days: u64,
    /// Days of partitions to provision behind today, for replayed history
    pub backfill_days: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(24 * 60 * 60),
            provision_days: 90,
            backfill_days: 0,
        }
    }
}

pub struct PartitionMaintenance {
    partitions: PartitionManager,
    config: MaintenanceConfig,
}

impl PartitionMaintenance {
    pub fn new(pool: PgPool, config: MaintenanceConfig) -> Self {
        Self {
            partitions: PartitionManager::new(pool),
            config,
        }
    }

    /// One prune + provision pass. Pruning runs first so a backfill window
    /// reaching into the retention horizon ends up provisioned, not dropped.
    pub async fn run_once(&self) -> costhouse_store::Result<()> {
        let today = Utc::now().date_naive();

        let (year, month) = previous_month(today);
        for date in month_days(year, month) {
            self.partitions.prune_day(date).await?;
        }
        info!(year, month, "pruned partitions for previous month");

        let start = today
            .checked_sub_days(Days::new(self.config.backfill_days))
            .unwrap_or(today);
        let days = self.config.backfill_days + self.config.provision_days + 1;
        self.partitions.provision_window(start, days).await?;

        Ok(())
    }

    /// Start the background maintenance loop.
    pub fn start(self: Arc<Self>, shutdown_rx: oneshot::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut shutdown_rx = shutdown_rx;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.run_once().await {
                            error!(error = %e, "partition maintenance tick failed");
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("partition maintenance shutting down");
                        break;
                    }
                }
            }
        })
    }
}

/// The calendar month before the one containing `today`.
fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

/// Every day of a calendar month.
fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut date = match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(d) => d,
        None => return days,
    };
    while date.month() == month {
        days.push(date);
        date = match date.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    days
}
