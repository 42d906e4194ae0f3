//! API models for REST endpoints

use chrono::NaiveDate;
use costhouse_store::{NodeDailySummary, PodDailySummary};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Pagination metadata echoed with every query response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryMetadata {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct NodeMetricsParams {
    /// Window start, `YYYY-MM-DD`. Defaults to the first day of the current
    /// UTC month.
    pub start_date: Option<String>,
    /// Window end, `YYYY-MM-DD`. Defaults to the current UTC day.
    pub end_date: Option<String>,
    /// Exact cluster UUID.
    pub cluster_id: Option<String>,
    /// Case-insensitive substring of the cluster name.
    pub cluster_name: Option<String>,
    /// Exact node type, e.g. `worker`.
    pub node_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PodMetricsParams {
    /// Window start, `YYYY-MM-DD`. Defaults to the first day of the current
    /// UTC month.
    pub start_date: Option<String>,
    /// Window end, `YYYY-MM-DD`. Defaults to the current UTC day.
    pub end_date: Option<String>,
    /// Exact cluster UUID.
    pub cluster_id: Option<String>,
    /// Case-insensitive substring of the cluster name.
    pub cluster_name: Option<String>,
    /// Case-insensitive substring of the namespace.
    pub namespace: Option<String>,
    /// Case-insensitive substring of the pod name.
    pub pod_name: Option<String>,
    /// Case-insensitive substring of the pod component.
    pub component: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NodeMetricsRow {
    pub date: NaiveDate,
    pub cluster_id: Uuid,
    pub cluster_name: String,
    pub node_name: String,
    pub node_identifier: String,
    pub node_type: String,
    pub core_count: i32,
    pub total_hours: i32,
}

impl From<NodeDailySummary> for NodeMetricsRow {
    fn from(s: NodeDailySummary) -> Self {
        Self {
            date: s.date,
            cluster_id: s.cluster_id,
            cluster_name: s.cluster_name,
            node_name: s.node_name,
            node_identifier: s.node_identifier,
            node_type: s.node_type,
            core_count: s.core_count,
            total_hours: s.total_hours,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PodMetricsRow {
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

impl From<PodDailySummary> for PodMetricsRow {
    fn from(s: PodDailySummary) -> Self {
        Self {
            date: s.date,
            max_cores_used: s.max_cores_used,
            total_pod_effective_core_seconds: s.total_pod_effective_core_seconds,
            total_hours: s.total_hours,
            cluster_id: s.cluster_id,
            cluster_name: s.cluster_name,
            namespace: s.namespace,
            pod_name: s.pod_name,
            component: s.component,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NodeMetricsResponse {
    pub metadata: QueryMetadata,
    pub data: Vec<NodeMetricsRow>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PodMetricsResponse {
    pub metadata: QueryMetadata,
    pub data: Vec<PodMetricsRow>,
}
