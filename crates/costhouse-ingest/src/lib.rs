//! Costhouse Ingestion Pipeline
//!
//! Turns an uploaded usage-report archive into rows in the store:
//!
//! ```text
//! archive bytes ──▶ archive decoder ──▶ (manifest, csv members)
//!                                            │
//!                                            ▼
//!                                      record processor ──▶ MetricsStore
//! ```
//!
//! The [`archive`] module decodes the gzip+tar upload and dispatches the CSV
//! members the manifest declares. The [`processor`] module validates and
//! parses each row, resolves cluster/node/pod identities through the store,
//! applies the [`labels`] allow-list, and maintains the raw hourly facts and
//! daily roll-ups.
//!
//! Everything here is request-scoped: one archive is processed sequentially
//! on the caller's task, and all shared state lives behind the store.

pub mod archive;
pub mod error;
pub mod labels;
pub mod processor;
pub mod table;

pub use archive::{CsvMember, Manifest};
pub use error::{IngestError, Result};
pub use labels::{LabelMatch, LabelPolicy, DEFAULT_LABEL_KEYS};
pub use processor::{ImportReport, RecordProcessor};
pub use table::{ReportTable, REQUIRED_COLUMNS};
