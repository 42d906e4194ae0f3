//! Report upload endpoint

use axum::extract::{Multipart, State};
use axum::Json;
use costhouse_ingest::RecordProcessor;
use tracing::info;

use crate::error::ApiError;
use crate::models::{ErrorResponse, UploadResponse};
use crate::AppState;

/// Largest accepted report archive.
pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Accept a gzip+tar usage-report archive as multipart form field `file` and
/// run it through the ingestion pipeline.
#[utoipa::path(
    post,
    path = "/api/ingress/v1/upload",
    responses(
        (status = 200, description = "Archive processed", body = UploadResponse),
        (status = 400, description = "Malformed archive or manifest", body = ErrorResponse),
        (status = 500, description = "Persistence failure", body = ErrorResponse)
    ),
    tag = "ingress"
)]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut content: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read file field: {e}")))?;
            if data.len() > MAX_UPLOAD_SIZE {
                return Err(ApiError::payload_too_large(format!(
                    "archive size ({} bytes) exceeds the maximum of {MAX_UPLOAD_SIZE} bytes",
                    data.len()
                )));
            }
            content = Some(data);
        }
    }

    let content = content.ok_or_else(|| ApiError::bad_request("file field is required"))?;

    let processor = RecordProcessor::new(state.store.as_ref(), &state.policy);
    let report = processor.import_archive(&content).await?;

    info!(
        cluster = %report.cluster_id,
        csv_files = report.csv_files,
        rows = report.rows_processed,
        skipped = report.rows_skipped,
        filtered_pods = report.pods_filtered,
        "report archive ingested"
    );

    Ok(Json(UploadResponse {
        message: report.message(),
    }))
}
