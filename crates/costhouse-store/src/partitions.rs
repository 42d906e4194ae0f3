//! Daily Range-Partition Lifecycle
//!
//! The hourly fact tables dominate row counts, so `node_metrics` and
//! `pod_metrics` are range-partitioned with one child table per calendar day
//! (UTC). This module owns the DDL for that lifecycle:
//!
//! - [`PartitionManager::provision_day`] creates the `[d, d+1)` partition for
//!   both tables plus a secondary `timestamp` index. Names are derived from
//!   the date, so re-provisioning is idempotent.
//! - [`PartitionManager::prune_day`] drops both partitions for a date, making
//!   retention an O(1) metadata operation. Missing partitions are fine.
//!
//! Ingestion never provisions partitions itself: a write into a day without
//! one fails with `StoreError::PartitionMissing`. Scheduling (the forward
//! window on startup, the daily provision/prune ticks) lives with the server,
//! not here.

use chrono::{Days, NaiveDate};
use sqlx::PgPool;
use tracing::info;

use crate::error::Result;

/// The range-partitioned parent tables.
const PARTITIONED_TABLES: [&str; 2] = ["node_metrics", "pod_metrics"];

/// Deterministic partition name for a table and day, e.g.
/// `node_metrics_y2025_m5_d17`.
pub fn partition_name(table: &str, date: NaiveDate) -> String {
    use chrono::Datelike;
    format!(
        "{table}_y{}_m{}_d{}",
        date.year(),
        date.month(),
        date.day()
    )
}

pub struct PartitionManager {
    pool: PgPool,
}

impl PartitionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensure the daily partition of every hourly table exists for `date`.
    pub async fn provision_day(&self, date: NaiveDate) -> Result<()> {
        let next = date
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);

        for table in PARTITIONED_TABLES {
            let partition = partition_name(table, date);
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {partition}
                 PARTITION OF {table}
                 FOR VALUES FROM ('{}') TO ('{}')",
                date.format("%Y-%m-%d"),
                next.format("%Y-%m-%d"),
            ))
            .execute(&self.pool)
            .await?;

            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {partition}_timestamp_idx
                 ON {partition} (timestamp)"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Provision every day in `[start, start + days)`.
    pub async fn provision_window(&self, start: NaiveDate, days: u64) -> Result<()> {
        let mut date = start;
        for _ in 0..days {
            self.provision_day(date).await?;
            date = match date.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        info!(start = %start, days, "provisioned daily partitions");
        Ok(())
    }

    /// Drop the daily partitions of every hourly table for `date`, if present.
    pub async fn prune_day(&self, date: NaiveDate) -> Result<()> {
        for table in PARTITIONED_TABLES {
            let partition = partition_name(table, date);
            sqlx::query(&format!("DROP TABLE IF EXISTS {partition}"))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}
