//! Store Error Types
//!
//! All repository and partition-manager operations return `Result<T>`, which
//! is aliased to `Result<T, StoreError>` so call sites can propagate with `?`.
//!
//! Two classifications matter to callers:
//!
//! - [`StoreError::is_transient`]: connection-level failures worth one retry
//!   (I/O errors, pool exhaustion). Everything else is treated as fatal for
//!   the row or archive that triggered it.
//! - [`StoreError::PartitionMissing`]: an hourly insert targeted a day whose
//!   range partition has not been provisioned. The partition manager owns
//!   provisioning; ingestion never creates partitions on the fly, so this is
//!   fatal for the row.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("no partition provisioned for write: {0}")]
    PartitionMissing(String),

    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// True for failures that are plausibly resolved by an immediate retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Io(_)) => true,
            StoreError::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            // PostgreSQL reports writes into an unprovisioned day as
            // "no partition of relation ... found for row".
            let message = db.message();
            if message.contains("no partition of relation") {
                return StoreError::PartitionMissing(message.to_string());
            }
        }
        StoreError::Database(e)
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(e.to_string())
    }
}
