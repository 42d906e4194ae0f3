//! Costhouse Persistence Layer
//!
//! This crate owns everything that touches PostgreSQL: the typed repository
//! the ingestion pipeline writes through, the bounded read queries the HTTP
//! layer serves from, and the daily range-partition lifecycle of the hourly
//! fact tables.
//!
//! ## What Gets Stored
//!
//! | Table | Contents | Growth |
//! |-------|----------|--------|
//! | `clusters`, `nodes`, `pods` | Entity identities, upserted on ingest | Small |
//! | `node_metrics`, `pod_metrics` | Raw hourly facts, partitioned by day | Dominant |
//! | `node_daily_summary`, `pod_daily_summary` | Incremental daily roll-ups | Bounded |
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐      ┌──────────────────┐
//! │ Record         │      │ MetricsStore     │
//! │ Processor      ├─────▶│ (trait)          │
//! └────────────────┘      └────────┬─────────┘
//!                                  │
//! ┌────────────────┐      ┌────────▼─────────┐     ┌──────────────────┐
//! │ HTTP queries   ├─────▶│ PostgresMetrics  │────▶│ PostgreSQL       │
//! └────────────────┘      │ Store            │     │ (day partitions) │
//!                         └──────────────────┘     └──────────────────┘
//! ```
//!
//! ## Idempotence by Conflict Rule
//!
//! Every write commits to an `ON CONFLICT` rule under its natural key, so a
//! partially re-run import is safe without wrapping an archive in one large
//! transaction. The hourly inserts additionally report whether the row was
//! newly observed; the processor uses that signal to advance the daily
//! roll-ups exactly once per hour, which keeps re-ingestion of an identical
//! archive from double-counting `total_hours`.
//!
//! ## Runtime Queries
//!
//! Queries go through `sqlx::query` at runtime rather than the compile-time
//! macros, so the crate builds without a `DATABASE_URL` present. Migrations
//! run on startup via `sqlx::migrate!("./migrations")`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod error;
pub mod partitions;
pub mod postgres;
pub mod types;

pub use error::{Result, StoreError};
pub use partitions::PartitionManager;
pub use postgres::PostgresMetricsStore;
pub use types::{
    clamp_limit, clamp_offset, NodeDailyFilter, NodeDailySummary, Page, PodDailyFilter,
    PodDailySummary, MAX_PAGE_SIZE,
};

/// Typed persistence operations over the relational store.
///
/// Implementations must be safe for concurrent use; every method acquires a
/// connection for its own duration and holds no cross-call state.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Insert a cluster or overwrite its name. The id is the manifest-declared
    /// cluster id and never changes.
    async fn upsert_cluster(&self, id: Uuid, name: &str) -> Result<()>;

    /// Insert or update a node and return its id.
    ///
    /// The natural key is `identifier` when present, `(cluster_id, name)`
    /// otherwise. On conflict the name, owning cluster, and type follow the
    /// incoming row.
    async fn upsert_node(
        &self,
        cluster_id: Uuid,
        name: &str,
        identifier: Option<&str>,
        node_type: &str,
    ) -> Result<Uuid>;

    /// Insert or update a pod keyed on `(cluster_id, namespace, name)` and
    /// return its id. `node_id` and `component` follow the incoming row.
    async fn upsert_pod(
        &self,
        cluster_id: Uuid,
        node_id: Uuid,
        name: &str,
        namespace: &str,
        component: &str,
    ) -> Result<Uuid>;

    /// Record an hourly node-capacity observation. Duplicate
    /// `(node_id, timestamp)` keys are no-ops.
    ///
    /// Returns true when the row was newly inserted.
    async fn insert_node_hourly(
        &self,
        node_id: Uuid,
        timestamp: DateTime<Utc>,
        core_count: i32,
        cluster_id: Uuid,
    ) -> Result<bool>;

    /// Record an hourly pod observation. On a duplicate `(pod_id, timestamp)`
    /// key the usage and request columns are summed into the existing row and
    /// the node-capacity columns are replaced.
    ///
    /// Returns true when the row was newly inserted rather than merged.
    async fn insert_pod_hourly(
        &self,
        pod_id: Uuid,
        timestamp: DateTime<Utc>,
        usage_cpu_core_seconds: f64,
        request_cpu_core_seconds: f64,
        node_capacity_cpu_core_seconds: f64,
        node_capacity_cpu_cores: i32,
    ) -> Result<bool>;

    /// Advance the node daily roll-up for the hour containing `timestamp`:
    /// first observation of `(node_id, day, core_count)` seeds
    /// `total_hours = 1`, later ones increment it.
    async fn upsert_node_daily(
        &self,
        node_id: Uuid,
        timestamp: DateTime<Utc>,
        core_count: i32,
    ) -> Result<()>;

    /// Advance the pod daily roll-up for the hour containing `timestamp`:
    /// `max_cores_used` takes the maximum, effective core seconds accumulate,
    /// `total_hours` increments.
    async fn upsert_pod_daily(
        &self,
        pod_id: Uuid,
        timestamp: DateTime<Utc>,
        effective_core_seconds: f64,
        effective_core_usage: f64,
    ) -> Result<()>;

    /// Paginated node roll-ups joined to their node and cluster, ordered by
    /// date ascending.
    async fn query_node_daily(&self, filter: &NodeDailyFilter) -> Result<Page<NodeDailySummary>>;

    /// Paginated pod roll-ups joined to their pod and cluster, ordered by
    /// date ascending.
    async fn query_pod_daily(&self, filter: &PodDailyFilter) -> Result<Page<PodDailySummary>>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<()>;
}
