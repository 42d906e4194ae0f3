//! Daily roll-up query endpoints
//!
//! Both endpoints serve the daily summary tables joined to their entities,
//! paginated, with an optional CSV rendering negotiated through the `Accept`
//! header.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use costhouse_store::{
    clamp_limit, clamp_offset, NodeDailyFilter, NodeDailySummary, PodDailyFilter, PodDailySummary,
};

use crate::error::ApiError;
use crate::models::{
    ErrorResponse, NodeMetricsParams, NodeMetricsResponse, PodMetricsParams, PodMetricsResponse,
    QueryMetadata,
};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolve the query window: explicit dates must be `YYYY-MM-DD`; the default
/// window runs from the start of the current UTC month through today.
fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let start = match start {
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_| ApiError::bad_request(format!("invalid start_date {raw:?}")))?,
        None => today.with_day(1).unwrap_or(today),
    };
    let end = match end {
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_| ApiError::bad_request(format!("invalid end_date {raw:?}")))?,
        None => today,
    };
    Ok((start, end))
}

fn wants_csv(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/csv"))
        .unwrap_or(false)
}

fn csv_attachment(filename: &str, body: String) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

fn render_csv(rows: Vec<Vec<String>>) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| ApiError::internal(format!("failed to render csv: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("failed to render csv: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ApiError::internal(format!("failed to render csv: {e}")))
}

fn node_metrics_csv(rows: &[NodeDailySummary]) -> Result<String, ApiError> {
    let mut records = vec![vec![
        "Date".to_string(),
        "ClusterID".to_string(),
        "ClusterName".to_string(),
        "NodeName".to_string(),
        "NodeIdentifier".to_string(),
        "NodeType".to_string(),
        "CoreCount".to_string(),
        "TotalHours".to_string(),
    ]];
    for row in rows {
        records.push(vec![
            row.date.to_string(),
            row.cluster_id.to_string(),
            row.cluster_name.clone(),
            row.node_name.clone(),
            row.node_identifier.clone(),
            row.node_type.clone(),
            row.core_count.to_string(),
            row.total_hours.to_string(),
        ]);
    }
    render_csv(records)
}

fn pod_metrics_csv(rows: &[PodDailySummary]) -> Result<String, ApiError> {
    let mut records = vec![vec![
        "Date".to_string(),
        "MaxCoresUsed".to_string(),
        "TotalPodEffectiveCoreSeconds".to_string(),
        "TotalHours".to_string(),
        "ClusterID".to_string(),
        "ClusterName".to_string(),
        "Namespace".to_string(),
        "PodName".to_string(),
        "Component".to_string(),
    ]];
    for row in rows {
        records.push(vec![
            row.date.to_string(),
            row.max_cores_used.to_string(),
            row.total_pod_effective_core_seconds.to_string(),
            row.total_hours.to_string(),
            row.cluster_id.to_string(),
            row.cluster_name.clone(),
            row.namespace.clone(),
            row.pod_name.clone(),
            row.component.clone(),
        ]);
    }
    render_csv(records)
}

/// Query daily node roll-ups.
#[utoipa::path(
    get,
    path = "/api/metrics/v1/nodes",
    params(NodeMetricsParams),
    responses(
        (status = 200, description = "Daily node metrics, JSON or CSV by Accept header", body = NodeMetricsResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    ),
    tag = "metrics"
)]
pub async fn query_node_metrics(
    State(state): State<AppState>,
    Query(params): Query<NodeMetricsParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let today = Utc::now().date_naive();
    let (start, end) =
        resolve_window(params.start_date.as_deref(), params.end_date.as_deref(), today)?;

    let filter = NodeDailyFilter {
        start,
        end,
        cluster_id: params.cluster_id,
        cluster_name: params.cluster_name,
        node_type: params.node_type,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        offset: params.offset.unwrap_or(0),
    };

    let page = state.store.query_node_daily(&filter).await?;

    if wants_csv(&headers) {
        let body = node_metrics_csv(&page.rows)?;
        return Ok(csv_attachment("node_metrics.csv", body));
    }

    Ok(Json(NodeMetricsResponse {
        metadata: QueryMetadata {
            total: page.total,
            limit: clamp_limit(filter.limit),
            offset: clamp_offset(filter.offset),
        },
        data: page.rows.into_iter().map(Into::into).collect(),
    })
    .into_response())
}

/// Query daily pod roll-ups.
#[utoipa::path(
    get,
    path = "/api/metrics/v1/pods",
    params(PodMetricsParams),
    responses(
        (status = 200, description = "Daily pod metrics, JSON or CSV by Accept header", body = PodMetricsResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    ),
    tag = "metrics"
)]
pub async fn query_pod_metrics(
    State(state): State<AppState>,
    Query(params): Query<PodMetricsParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let today = Utc::now().date_naive();
    let (start, end) =
        resolve_window(params.start_date.as_deref(), params.end_date.as_deref(), today)?;

    let filter = PodDailyFilter {
        start,
        end,
        cluster_id: params.cluster_id,
        cluster_name: params.cluster_name,
        namespace: params.namespace,
        pod_name: params.pod_name,
        component: params.component,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        offset: params.offset.unwrap_or(0),
    };

    let page = state.store.query_pod_daily(&filter).await?;

    if wants_csv(&headers) {
        let body = pod_metrics_csv(&page.rows)?;
        return Ok(csv_attachment("pod_metrics.csv", body));
    }

    Ok(Json(PodMetricsResponse {
        metadata: QueryMetadata {
            total: page.total,
            limit: clamp_limit(filter.limit),
            offset: clamp_offset(filter.offset),
        },
        data: page.rows.into_iter().map(Into::into).collect(),
    })
    .into_response())
}
