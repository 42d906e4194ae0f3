//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the conversions below encode
//! the propagation policy: archive and schema faults are the client's (400),
//! persistence faults are ours (500).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use costhouse_ingest::IngestError;
use costhouse_store::StoreError;

use crate::models::ErrorResponse;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self
            .status
            .canonical_reason()
            .unwrap_or("error")
            .to_string();
        (
            self.status,
            Json(ErrorResponse {
                error,
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        if e.is_client_error() {
            ApiError::bad_request(e.to_string())
        } else {
            tracing::error!(error = %e, "archive import failed");
            ApiError::internal("failed to process report archive")
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "store operation failed");
        ApiError::internal("store operation failed")
    }
}
