//! Record Processor
//!
//! Drives one uploaded archive end to end: manifest, cluster upsert, then
//! every declared CSV in manifest order. Within a CSV, rows are processed
//! sequentially; there is no cross-request state, so aggregation bookkeeping
//! stays local and lock-free.
//!
//! ## Per-Row Flow
//!
//! ```text
//! row ──▶ validate/parse ──▶ upsert node ──▶ insert node hour ──▶ node daily
//!                                   │
//!                                   └─▶ label filter ──▶ upsert pod
//!                                              │
//!                                              └─▶ insert pod hour ──▶ (coalesce)
//! ```
//!
//! Row-scoped failures (bad timestamp, bad number, a store error on one row)
//! drop the row and keep going; they are counted, logged at `warn`, and never
//! fail the archive. The one deliberate parsing asymmetry: an unparseable
//! `pod_request_cpu_core_seconds` coerces to `0.0` instead of dropping the
//! row, because absent requests are a routine gap in upstream reports.
//!
//! ## Daily Roll-Up Discipline
//!
//! The hourly inserts report whether their key was newly observed, and daily
//! roll-ups advance only for fresh keys. That makes `total_hours` a count of
//! distinct observed hours no matter how many rows share an hour, and it
//! makes re-ingesting the same archive a no-op for both daily tables.
//!
//! Pod observations additionally coalesce in memory per `(pod, hour)`: usage
//! and request sum across duplicate rows, node capacity keeps the last
//! value. The daily upsert then runs once per fresh coalesced observation
//! with `effective_core_seconds = max(usage, request)`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use costhouse_store::MetricsStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::{self, CsvMember};
use crate::error::{IngestError, Result};
use crate::labels::LabelPolicy;
use crate::table::ReportTable;

/// Summary of one archive import, for logs and the upload response.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub cluster_id: Uuid,
    pub csv_files: usize,
    pub rows_processed: u64,
    pub rows_skipped: u64,
    pub pods_filtered: u64,
    pub failed_files: Vec<String>,
}

impl ImportReport {
    pub fn message(&self) -> String {
        format!(
            "processed {} rows from {} csv files for cluster {}",
            self.rows_processed, self.csv_files, self.cluster_id
        )
    }
}

#[derive(Debug, Default)]
struct TableStats {
    processed: u64,
    skipped: u64,
    pods_filtered: u64,
}

/// One validated, fully parsed report row.
#[derive(Debug)]
struct ParsedRow {
    interval_start: DateTime<Utc>,
    node_name: String,
    resource_id: String,
    node_type: String,
    capacity_cores: f64,
    capacity_core_seconds: f64,
    namespace: String,
    pod_name: String,
    pod_labels: String,
    usage: f64,
    request: f64,
}

/// Why a row was dropped; for logging only.
#[derive(Debug)]
enum RowSkip {
    FieldCount { expected: usize, got: usize },
    Timestamp(String),
    Number { column: &'static str, value: String },
}

impl std::fmt::Display for RowSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSkip::FieldCount { expected, got } => {
                write!(f, "expected {expected} fields, got {got}")
            }
            RowSkip::Timestamp(value) => write!(f, "invalid interval_start {value:?}"),
            RowSkip::Number { column, value } => write!(f, "invalid {column} {value:?}"),
        }
    }
}

/// Parse an `interval_start` value of the form
/// `YYYY-MM-DD HH:MM:SS +0000 UTC`.
fn parse_interval(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim_end();
    DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S %z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_float(column: &'static str, value: &str) -> std::result::Result<f64, RowSkip> {
    value.parse::<f64>().map_err(|_| RowSkip::Number {
        column,
        value: value.to_string(),
    })
}

fn parse_row(table: &ReportTable, row: &csv::StringRecord) -> std::result::Result<ParsedRow, RowSkip> {
    if !table.row_matches_header(row) {
        return Err(RowSkip::FieldCount {
            expected: table.header_len(),
            got: row.len(),
        });
    }

    let interval_start_raw = table.field(row, "interval_start");
    let interval_start = parse_interval(interval_start_raw)
        .ok_or_else(|| RowSkip::Timestamp(interval_start_raw.to_string()))?;

    let capacity_cores = parse_float("node_capacity_cpu_cores", table.field(row, "node_capacity_cpu_cores"))?;
    let usage = parse_float(
        "pod_usage_cpu_core_seconds",
        table.field(row, "pod_usage_cpu_core_seconds"),
    )?;
    let capacity_core_seconds = parse_float(
        "node_capacity_cpu_core_seconds",
        table.field(row, "node_capacity_cpu_core_seconds"),
    )?;

    // Requests are routinely absent upstream; treat an unparseable value as
    // zero rather than dropping the row.
    let request_raw = table.field(row, "pod_request_cpu_core_seconds");
    let request = match request_raw.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            debug!(value = request_raw, "unparseable pod request, using 0.0");
            0.0
        }
    };

    let node_role = table.field(row, "node_role");
    let node_type = if node_role.is_empty() { "worker" } else { node_role };

    Ok(ParsedRow {
        interval_start,
        node_name: table.field(row, "node").to_string(),
        resource_id: table.field(row, "resource_id").to_string(),
        node_type: node_type.to_string(),
        capacity_cores,
        capacity_core_seconds,
        namespace: table.field(row, "namespace").to_string(),
        pod_name: table.field(row, "pod").to_string(),
        pod_labels: table.field(row, "pod_labels").to_string(),
        usage,
        request,
    })
}

/// Coalesced per-(pod, hour) observation.
#[derive(Debug, Default, Clone, Copy)]
struct PodHourAccum {
    usage: f64,
    request: f64,
    capacity_core_seconds: f64,
}

pub struct RecordProcessor<'a> {
    store: &'a dyn MetricsStore,
    policy: &'a LabelPolicy,
}

impl<'a> RecordProcessor<'a> {
    pub fn new(store: &'a dyn MetricsStore, policy: &'a LabelPolicy) -> Self {
        Self { store, policy }
    }

    /// Import one uploaded archive.
    ///
    /// Archive-level faults (unreadable archive, bad manifest, non-UUID
    /// cluster id, a store failure outside row scope) abort the import. A
    /// schema fault in one CSV aborts only that CSV, unless it was the only
    /// declared CSV.
    pub async fn import_archive(&self, bytes: &[u8]) -> Result<ImportReport> {
        let manifest = archive::read_manifest(bytes)?;
        let cluster_id = manifest.cluster_uuid()?;
        let cluster_name = manifest.effective_cluster_name();

        self.store.upsert_cluster(cluster_id, cluster_name).await?;
        info!(cluster = %cluster_id, name = cluster_name, "cluster upserted from manifest");

        let members = archive::read_declared_csvs(bytes, &manifest)?;
        let only_csv = members.len() == 1;

        let mut report = ImportReport {
            cluster_id,
            csv_files: members.len(),
            rows_processed: 0,
            rows_skipped: 0,
            pods_filtered: 0,
            failed_files: Vec::new(),
        };

        for member in &members {
            match self.process_table(cluster_id, member).await {
                Ok(stats) => {
                    info!(
                        file = %member.name,
                        rows = stats.processed,
                        skipped = stats.skipped,
                        "processed csv member"
                    );
                    report.rows_processed += stats.processed;
                    report.rows_skipped += stats.skipped;
                    report.pods_filtered += stats.pods_filtered;
                }
                Err(e @ IngestError::Schema { .. }) => {
                    if only_csv {
                        return Err(e);
                    }
                    warn!(file = %member.name, error = %e, "skipping csv member");
                    report.failed_files.push(member.name.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Process one declared CSV member.
    async fn process_table(&self, cluster_id: Uuid, member: &CsvMember) -> Result<TableStats> {
        let table = ReportTable::parse(&member.name, &member.data)?;

        let mut stats = TableStats {
            skipped: table.unreadable_rows,
            ..TableStats::default()
        };
        let mut pod_hours: BTreeMap<(Uuid, DateTime<Utc>), PodHourAccum> = BTreeMap::new();
        let mut fresh_pod_hours: BTreeSet<(Uuid, DateTime<Utc>)> = BTreeSet::new();

        for row in &table.rows {
            let parsed = match parse_row(&table, row) {
                Ok(parsed) => parsed,
                Err(skip) => {
                    warn!(file = %member.name, reason = %skip, "skipping row");
                    stats.skipped += 1;
                    continue;
                }
            };

            match self
                .process_row(cluster_id, &parsed, &mut pod_hours, &mut fresh_pod_hours)
                .await
            {
                Ok(pod_written) => {
                    if !pod_written {
                        stats.pods_filtered += 1;
                    }
                    stats.processed += 1;
                }
                Err(e) => {
                    warn!(file = %member.name, error = %e, "skipping row after store failure");
                    stats.skipped += 1;
                }
            }
        }

        // Daily pod roll-ups run once per coalesced observation, and only for
        // hours this import newly observed.
        for (key, accum) in &pod_hours {
            if !fresh_pod_hours.contains(key) {
                continue;
            }
            let (pod_id, interval_start) = *key;
            let effective_core_seconds = accum.usage.max(accum.request);
            let effective_core_usage = if accum.capacity_core_seconds > 0.0 {
                effective_core_seconds / accum.capacity_core_seconds
            } else {
                0.0
            };
            if let Err(e) = self
                .store
                .upsert_pod_daily(pod_id, interval_start, effective_core_seconds, effective_core_usage)
                .await
            {
                warn!(
                    file = %member.name,
                    pod = %pod_id,
                    error = %e,
                    "failed to update pod daily summary"
                );
            }
        }

        Ok(stats)
    }

    /// Write one parsed row. Returns whether the pod half was persisted.
    async fn process_row(
        &self,
        cluster_id: Uuid,
        row: &ParsedRow,
        pod_hours: &mut BTreeMap<(Uuid, DateTime<Utc>), PodHourAccum>,
        fresh_pod_hours: &mut BTreeSet<(Uuid, DateTime<Utc>)>,
    ) -> Result<bool> {
        let identifier = if row.resource_id.is_empty() {
            None
        } else {
            Some(row.resource_id.as_str())
        };

        let node_id = self
            .store
            .upsert_node(cluster_id, &row.node_name, identifier, &row.node_type)
            .await?;

        let core_count = row.capacity_cores as i32;
        let node_hour_fresh = self
            .store
            .insert_node_hourly(node_id, row.interval_start, core_count, cluster_id)
            .await?;
        if node_hour_fresh {
            self.store
                .upsert_node_daily(node_id, row.interval_start, core_count)
                .await?;
        }

        let verdict = self.policy.evaluate(&row.pod_labels);
        if !verdict.matched {
            debug!(
                pod = %row.pod_name,
                namespace = %row.namespace,
                "dropping pod without a recognized label key"
            );
            return Ok(false);
        }

        let pod_id = self
            .store
            .upsert_pod(
                cluster_id,
                node_id,
                &row.pod_name,
                &row.namespace,
                &verdict.component,
            )
            .await?;

        let pod_hour_fresh = self
            .store
            .insert_pod_hourly(
                pod_id,
                row.interval_start,
                row.usage,
                row.request,
                row.capacity_core_seconds,
                core_count,
            )
            .await?;

        let key = (pod_id, row.interval_start);
        let accum = pod_hours.entry(key).or_default();
        accum.usage += row.usage;
        accum.request += row.request;
        accum.capacity_core_seconds = row.capacity_core_seconds;
        if pod_hour_fresh {
            fresh_pod_hours.insert(key);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_parsing_accepts_the_report_layout() {
        let parsed = parse_interval("2025-05-17 14:00:00 +0000 UTC").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-05-17T14:00:00+00:00");
    }

    #[test]
    fn interval_parsing_accepts_missing_zone_abbreviation() {
        assert!(parse_interval("2025-05-17 14:00:00 +0000").is_some());
    }

    #[test]
    fn interval_parsing_rejects_garbage() {
        assert!(parse_interval("invalid-timestamp").is_none());
        assert!(parse_interval("").is_none());
        assert!(parse_interval("2025-05-17").is_none());
    }

    #[test]
    fn interval_parsing_normalizes_offsets_to_utc() {
        let parsed = parse_interval("2025-05-17 16:00:00 +0200 CEST").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-05-17T14:00:00+00:00");
    }
}
