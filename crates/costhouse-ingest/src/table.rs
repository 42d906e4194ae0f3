//! CSV table access for usage reports.
//!
//! Reports are comma-delimited UTF-8 with a mandatory header row. Columns are
//! located by name, order-free; unknown columns are allowed and ignored. A
//! missing required column fails the whole file.

use std::collections::HashMap;

use csv::StringRecord;
use tracing::warn;

use crate::error::{IngestError, Result};

/// Columns every usage report must carry.
pub const REQUIRED_COLUMNS: [&str; 20] = [
    "report_period_start",
    "report_period_end",
    "interval_start",
    "interval_end",
    "node",
    "namespace",
    "pod",
    "pod_usage_cpu_core_seconds",
    "pod_request_cpu_core_seconds",
    "pod_limit_cpu_core_seconds",
    "pod_usage_memory_byte_seconds",
    "pod_request_memory_byte_seconds",
    "pod_limit_memory_byte_seconds",
    "node_capacity_cpu_cores",
    "node_capacity_cpu_core_seconds",
    "node_capacity_memory_bytes",
    "node_capacity_memory_byte_seconds",
    "node_role",
    "resource_id",
    "pod_labels",
];

/// A parsed report file: header index plus its data rows.
#[derive(Debug)]
pub struct ReportTable {
    indices: HashMap<String, usize>,
    header_len: usize,
    pub rows: Vec<StringRecord>,
    /// Rows the csv reader itself could not decode.
    pub unreadable_rows: u64,
}

impl ReportTable {
    /// Read and validate a report file.
    pub fn parse(file: &str, data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(data);

        let headers = reader.headers().map_err(|e| IngestError::Schema {
            file: file.to_string(),
            reason: format!("unreadable header row: {e}"),
        })?;

        let mut indices = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            indices.insert(header.to_string(), i);
        }
        let header_len = headers.len();

        for required in REQUIRED_COLUMNS {
            if !indices.contains_key(required) {
                return Err(IngestError::Schema {
                    file: file.to_string(),
                    reason: format!("missing required column {required}"),
                });
            }
        }

        let mut rows = Vec::new();
        let mut unreadable_rows = 0;
        for record in reader.records() {
            match record {
                Ok(record) => rows.push(record),
                Err(e) => {
                    warn!(file, error = %e, "skipping unreadable csv row");
                    unreadable_rows += 1;
                }
            }
        }

        Ok(Self {
            indices,
            header_len,
            rows,
            unreadable_rows,
        })
    }

    /// True when the row carries exactly as many fields as the header.
    pub fn row_matches_header(&self, row: &StringRecord) -> bool {
        row.len() == self.header_len
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Field value by column name; empty for columns the row does not have.
    pub fn field<'r>(&self, row: &'r StringRecord, column: &str) -> &'r str {
        self.indices
            .get(column)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
    }
}
