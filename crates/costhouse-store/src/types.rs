//! Store Type Definitions
//!
//! Row and filter types shared between the repository and its consumers.
//!
//! The daily summary types are the joined query results served by the read
//! API, not raw table rows: each carries the owning cluster (and node or pod)
//! attributes alongside the roll-up columns so the HTTP layer never issues a
//! second lookup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest page a single query may return.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// One page of query results plus the unpaginated total under the same
/// filters, for pagination metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: i64,
}

/// Joined daily node roll-up row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDailySummary {
    pub date: NaiveDate,
    pub cluster_id: Uuid,
    pub cluster_name: String,
    pub node_name: String,
    pub node_identifier: String,
    pub node_type: String,
    pub core_count: i32,
    pub total_hours: i32,
}

/// Joined daily pod roll-up row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodDailySummary {
    pub date: NaiveDate,
    pub max_cores_used: f64,
    pub total_pod_effective_core_seconds: f64,
    pub total_hours: i32,
    pub cluster_id: Uuid,
    pub cluster_name: String,
    pub namespace: String,
    pub pod_name: String,
    pub component: String,
}

/// Filters for [`crate::MetricsStore::query_node_daily`].
///
/// `cluster_name` matches as a case-insensitive substring; `cluster_id` is an
/// exact textual match against the UUID; `node_type` is exact equality.
#[derive(Debug, Clone)]
pub struct NodeDailyFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub node_type: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Filters for [`crate::MetricsStore::query_pod_daily`].
///
/// All text filters except `cluster_id` match as case-insensitive substrings.
#[derive(Debug, Clone)]
pub struct PodDailyFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub namespace: Option<String>,
    pub pod_name: Option<String>,
    pub component: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Clamp a requested page size into the supported range.
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Offsets below zero read as zero.
pub fn clamp_offset(offset: i64) -> i64 {
    offset.max(0)
}
