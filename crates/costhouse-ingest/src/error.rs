//! Ingestion Error Types
//!
//! The error taxonomy mirrors the blast radius of each failure:
//!
//! - [`IngestError::Archive`]: the archive itself is unusable (bad gzip/tar,
//!   missing or malformed manifest, non-UUID cluster id). Fatal for the
//!   upload; the HTTP layer maps it to 400.
//! - [`IngestError::Schema`]: a declared CSV lacks a required column. Fatal
//!   for that CSV only, unless it was the archive's only CSV.
//! - [`IngestError::Store`]: a persistence failure that prevented the archive
//!   from completing. Row-scoped store failures are absorbed by the
//!   processor (logged, row dropped) and never reach this type.

use costhouse_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid report archive: {0}")]
    Archive(String),

    #[error("csv schema error in {file}: {reason}")]
    Schema { file: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IngestError {
    /// True when the fault lies with the uploaded archive rather than the
    /// service, i.e. the transport should answer 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::Archive(_) | IngestError::Schema { .. })
    }
}
