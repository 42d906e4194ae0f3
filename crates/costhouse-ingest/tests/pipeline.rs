//! End-to-end pipeline tests: archive bytes through the record processor into
//! an in-memory store that mirrors the PostgreSQL conflict rules.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use costhouse_store::{
    MetricsStore, NodeDailyFilter, NodeDailySummary, Page, PodDailyFilter, PodDailySummary,
    Result as StoreResult,
};
use costhouse_ingest::{IngestError, LabelPolicy, RecordProcessor};
use flate2::write::GzEncoder;
use flate2::Compression;
use uuid::Uuid;

const CLUSTER_ID: &str = "10f5a0f9-223a-41c1-8456-9a3eb0323a99";

const CSV_HEADER: &str = "report_period_start,report_period_end,interval_start,interval_end,\
node,namespace,pod,pod_usage_cpu_core_seconds,pod_request_cpu_core_seconds,\
pod_limit_cpu_core_seconds,pod_usage_memory_byte_seconds,pod_request_memory_byte_seconds,\
pod_limit_memory_byte_seconds,node_capacity_cpu_cores,node_capacity_cpu_core_seconds,\
node_capacity_memory_bytes,node_capacity_memory_byte_seconds,node_role,resource_id,pod_labels";

#[derive(Debug, Clone)]
struct NodeRow {
    id: Uuid,
    cluster_id: Uuid,
    name: String,
    identifier: Option<String>,
    node_type: String,
}

#[derive(Debug, Clone)]
struct PodRow {
    id: Uuid,
    cluster_id: Uuid,
    node_id: Uuid,
    name: String,
    namespace: String,
    component: String,
}

#[derive(Debug, Clone, Copy)]
struct PodHourRow {
    usage: f64,
    request: f64,
    capacity_core_seconds: f64,
    capacity_cores: i32,
}

#[derive(Debug, Clone, Copy)]
struct PodDailyRow {
    max_cores_used: f64,
    total_effective_core_seconds: f64,
    total_hours: i32,
}

#[derive(Default)]
struct Inner {
    clusters: HashMap<Uuid, String>,
    nodes: Vec<NodeRow>,
    pods: Vec<PodRow>,
    node_hours: HashMap<(Uuid, DateTime<Utc>), i32>,
    pod_hours: HashMap<(Uuid, DateTime<Utc>), PodHourRow>,
    node_daily: HashMap<(Uuid, NaiveDate, i32), i32>,
    pod_daily: HashMap<(Uuid, NaiveDate), PodDailyRow>,
}

/// In-memory double of the PostgreSQL store, conflict rules included.
#[derive(Default)]
struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn upsert_cluster(&self, id: Uuid, name: &str) -> StoreResult<()> {
        self.lock().clusters.insert(id, name.to_string());
        Ok(())
    }

    async fn upsert_node(
        &self,
        cluster_id: Uuid,
        name: &str,
        identifier: Option<&str>,
        node_type: &str,
    ) -> StoreResult<Uuid> {
        let mut inner = self.lock();
        if let Some(identifier) = identifier {
            if let Some(existing) = inner
                .nodes
                .iter_mut()
                .find(|n| n.identifier.as_deref() == Some(identifier))
            {
                existing.name = name.to_string();
                existing.cluster_id = cluster_id;
                existing.node_type = node_type.to_string();
                return Ok(existing.id);
            }
        } else if let Some(existing) = inner
            .nodes
            .iter_mut()
            .find(|n| n.identifier.is_none() && n.cluster_id == cluster_id && n.name == name)
        {
            existing.node_type = node_type.to_string();
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        inner.nodes.push(NodeRow {
            id,
            cluster_id,
            name: name.to_string(),
            identifier: identifier.map(str::to_string),
            node_type: node_type.to_string(),
        });
        Ok(id)
    }

    async fn upsert_pod(
        &self,
        cluster_id: Uuid,
        node_id: Uuid,
        name: &str,
        namespace: &str,
        component: &str,
    ) -> StoreResult<Uuid> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .pods
            .iter_mut()
            .find(|p| p.cluster_id == cluster_id && p.namespace == namespace && p.name == name)
        {
            existing.node_id = node_id;
            existing.component = component.to_string();
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        inner.pods.push(PodRow {
            id,
            cluster_id,
            node_id,
            name: name.to_string(),
            namespace: namespace.to_string(),
            component: component.to_string(),
        });
        Ok(id)
    }

    async fn insert_node_hourly(
        &self,
        node_id: Uuid,
        timestamp: DateTime<Utc>,
        core_count: i32,
        _cluster_id: Uuid,
    ) -> StoreResult<bool> {
        let mut inner = self.lock();
        match inner.node_hours.entry((node_id, timestamp)) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(core_count);
                Ok(true)
            }
        }
    }

    async fn insert_pod_hourly(
        &self,
        pod_id: Uuid,
        timestamp: DateTime<Utc>,
        usage_cpu_core_seconds: f64,
        request_cpu_core_seconds: f64,
        node_capacity_cpu_core_seconds: f64,
        node_capacity_cpu_cores: i32,
    ) -> StoreResult<bool> {
        let mut inner = self.lock();
        match inner.pod_hours.entry((pod_id, timestamp)) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                let row = slot.get_mut();
                row.usage += usage_cpu_core_seconds;
                row.request += request_cpu_core_seconds;
                row.capacity_core_seconds = node_capacity_cpu_core_seconds;
                row.capacity_cores = node_capacity_cpu_cores;
                Ok(false)
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(PodHourRow {
                    usage: usage_cpu_core_seconds,
                    request: request_cpu_core_seconds,
                    capacity_core_seconds: node_capacity_cpu_core_seconds,
                    capacity_cores: node_capacity_cpu_cores,
                });
                Ok(true)
            }
        }
    }

    async fn upsert_node_daily(
        &self,
        node_id: Uuid,
        timestamp: DateTime<Utc>,
        core_count: i32,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        *inner
            .node_daily
            .entry((node_id, timestamp.date_naive(), core_count))
            .or_insert(0) += 1;
        Ok(())
    }

    async fn upsert_pod_daily(
        &self,
        pod_id: Uuid,
        timestamp: DateTime<Utc>,
        effective_core_seconds: f64,
        effective_core_usage: f64,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        inner
            .pod_daily
            .entry((pod_id, timestamp.date_naive()))
            .and_modify(|row| {
                row.max_cores_used = row.max_cores_used.max(effective_core_usage);
                row.total_effective_core_seconds += effective_core_seconds;
                row.total_hours += 1;
            })
            .or_insert(PodDailyRow {
                max_cores_used: effective_core_usage,
                total_effective_core_seconds: effective_core_seconds,
                total_hours: 1,
            });
        Ok(())
    }

    async fn query_node_daily(
        &self,
        _filter: &NodeDailyFilter,
    ) -> StoreResult<Page<NodeDailySummary>> {
        Ok(Page {
            rows: Vec::new(),
            total: 0,
        })
    }

    async fn query_pod_daily(
        &self,
        _filter: &PodDailyFilter,
    ) -> StoreResult<Page<PodDailySummary>> {
        Ok(Page {
            rows: Vec::new(),
            total: 0,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn build_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o600);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn manifest_json(files: &[&str]) -> String {
    serde_json::json!({
        "cluster_id": CLUSTER_ID,
        "files": files,
        "cr_status": {
            "clusterID": CLUSTER_ID,
            "source": {"name": "test-cluster"}
        }
    })
    .to_string()
}

/// A report row for node `ip-10-0-1-63` / pod `zip-1` in namespace `test`.
fn report_row(interval_start: &str, usage: &str, request: &str, labels: &str) -> String {
    format!(
        "2025-05-17 00:00:00 +0000 UTC,2025-05-17 23:59:59 +0000 UTC,{interval_start},\
2025-05-17 15:00:00 +0000 UTC,ip-10-0-1-63.ec2.internal,test,zip-1,{usage},{request},300,\
1000,2000,3000,4,14400,17179869184,61729433600,worker,i-09ad6102842b9a786,{labels}"
    )
}

fn single_csv_archive(rows: &[String]) -> Vec<u8> {
    let csv = format!("{CSV_HEADER}\n{}", rows.join("\n"));
    build_archive(&[("manifest.json", &manifest_json(&["data.csv"])), ("data.csv", &csv)])
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z")
        .unwrap()
        .with_timezone(&Utc)
}

fn policy() -> LabelPolicy {
    LabelPolicy::new("label_rht_comp")
}

#[tokio::test]
async fn single_row_ingest_writes_node_pod_and_rollups() {
    let store = MemoryStore::default();
    let bytes = single_csv_archive(&[report_row(
        "2025-05-17 14:00:00 +0000 UTC",
        "100",
        "200",
        "app:web|label_rht_comp:EAP",
    )]);

    let policy = policy();
    let report = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    assert_eq!(report.rows_processed, 1);
    assert_eq!(report.rows_skipped, 0);

    let inner = store.lock();
    let cluster_id = Uuid::parse_str(CLUSTER_ID).unwrap();
    assert_eq!(inner.clusters.get(&cluster_id).map(String::as_str), Some("test-cluster"));

    assert_eq!(inner.nodes.len(), 1);
    let node = &inner.nodes[0];
    assert_eq!(node.name, "ip-10-0-1-63.ec2.internal");
    assert_eq!(node.identifier.as_deref(), Some("i-09ad6102842b9a786"));
    assert_eq!(node.node_type, "worker");

    assert_eq!(inner.pods.len(), 1);
    let pod = &inner.pods[0];
    assert_eq!(pod.component, "EAP");
    assert_eq!(pod.namespace, "test");
    assert_eq!(pod.node_id, node.id);

    let stamp = ts("2025-05-17 14:00:00 +0000");
    assert_eq!(inner.node_hours.get(&(node.id, stamp)), Some(&4));

    let pod_hour = inner.pod_hours.get(&(pod.id, stamp)).unwrap();
    assert_eq!(pod_hour.usage, 100.0);
    assert_eq!(pod_hour.request, 200.0);
    assert_eq!(pod_hour.capacity_core_seconds, 14400.0);
    assert_eq!(pod_hour.capacity_cores, 4);

    let day = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();
    assert_eq!(inner.node_daily.get(&(node.id, day, 4)), Some(&1));

    let daily = inner.pod_daily.get(&(pod.id, day)).unwrap();
    assert_eq!(daily.total_hours, 1);
    assert_eq!(daily.total_effective_core_seconds, 200.0);
    assert!((daily.max_cores_used - 200.0 / 14400.0).abs() < 1e-9);
}

#[tokio::test]
async fn duplicate_hour_rows_coalesce_before_daily_rollup() {
    let store = MemoryStore::default();
    let bytes = single_csv_archive(&[
        report_row("2025-05-17 14:00:00 +0000 UTC", "100", "200", "label_rht_comp:EAP"),
        report_row("2025-05-17 14:00:00 +0000 UTC", "150", "250", "label_rht_comp:EAP"),
        report_row("2025-05-17 15:00:00 +0000 UTC", "200", "300", "label_rht_comp:EAP"),
    ]);

    let policy = policy();
    RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    let inner = store.lock();
    let pod_id = inner.pods[0].id;
    let node_id = inner.nodes[0].id;
    let day = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();

    let fourteen = inner.pod_hours.get(&(pod_id, ts("2025-05-17 14:00:00 +0000"))).unwrap();
    assert_eq!(fourteen.usage, 250.0);
    assert_eq!(fourteen.request, 450.0);

    let fifteen = inner.pod_hours.get(&(pod_id, ts("2025-05-17 15:00:00 +0000"))).unwrap();
    assert_eq!(fifteen.usage, 200.0);
    assert_eq!(fifteen.request, 300.0);

    // Two distinct hours, even though three rows were seen.
    assert_eq!(inner.node_daily.get(&(node_id, day, 4)), Some(&2));

    let daily = inner.pod_daily.get(&(pod_id, day)).unwrap();
    assert_eq!(daily.total_hours, 2);
    // max(250, 450) + max(200, 300)
    assert_eq!(daily.total_effective_core_seconds, 750.0);
    assert!((daily.max_cores_used - 450.0 / 14400.0).abs() < 1e-9);
}

#[tokio::test]
async fn rows_without_recognized_label_keep_node_but_drop_pod() {
    let store = MemoryStore::default();
    let bytes = single_csv_archive(&[report_row(
        "2025-05-17 14:00:00 +0000 UTC",
        "100",
        "200",
        "app:web",
    )]);

    let policy = policy();
    let report = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    assert_eq!(report.pods_filtered, 1);

    let inner = store.lock();
    assert_eq!(inner.nodes.len(), 1);
    assert_eq!(inner.node_hours.len(), 1);
    assert!(inner.pods.is_empty());
    assert!(inner.pod_hours.is_empty());
    assert!(inner.pod_daily.is_empty());
}

#[tokio::test]
async fn invalid_timestamp_drops_the_whole_row() {
    let store = MemoryStore::default();
    let bytes = single_csv_archive(&[report_row(
        "invalid-timestamp",
        "100",
        "200",
        "label_rht_comp:EAP",
    )]);

    let policy = policy();
    let report = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    assert_eq!(report.rows_processed, 0);
    assert_eq!(report.rows_skipped, 1);

    let inner = store.lock();
    assert!(inner.nodes.is_empty());
    assert!(inner.node_hours.is_empty());
    assert!(inner.pod_hours.is_empty());
    assert!(inner.node_daily.is_empty());
    assert!(inner.pod_daily.is_empty());
}

#[tokio::test]
async fn archive_without_manifest_is_rejected_with_no_writes() {
    let store = MemoryStore::default();
    let csv = format!(
        "{CSV_HEADER}\n{}",
        report_row("2025-05-17 14:00:00 +0000 UTC", "100", "200", "label_rht_comp:EAP")
    );
    let bytes = build_archive(&[("data.csv", &csv)]);

    let policy = policy();
    let err = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Archive(_)));
    assert!(store.lock().clusters.is_empty());
}

#[tokio::test]
async fn reingesting_the_same_archive_leaves_daily_rollups_unchanged() {
    let store = MemoryStore::default();
    let bytes = single_csv_archive(&[report_row(
        "2025-05-17 14:00:00 +0000 UTC",
        "100",
        "200",
        "app:web|label_rht_comp:EAP",
    )]);

    let policy = policy();
    let processor = RecordProcessor::new(&store, &policy);
    processor.import_archive(&bytes).await.unwrap();
    processor.import_archive(&bytes).await.unwrap();

    let inner = store.lock();
    let node_id = inner.nodes[0].id;
    let pod_id = inner.pods[0].id;
    let day = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();

    assert_eq!(inner.nodes.len(), 1);
    assert_eq!(inner.pods.len(), 1);
    assert_eq!(inner.node_hours.len(), 1);

    assert_eq!(inner.node_daily.get(&(node_id, day, 4)), Some(&1));
    let daily = inner.pod_daily.get(&(pod_id, day)).unwrap();
    assert_eq!(daily.total_hours, 1);
    assert_eq!(daily.total_effective_core_seconds, 200.0);

    // The raw pod hour accumulates under its conflict rule; the roll-ups do
    // not, because the hour was no longer newly observed.
    let pod_hour = inner.pod_hours.get(&(pod_id, ts("2025-05-17 14:00:00 +0000"))).unwrap();
    assert_eq!(pod_hour.usage, 200.0);
    assert_eq!(pod_hour.request, 400.0);
}

#[tokio::test]
async fn schema_failure_on_the_only_csv_fails_the_archive() {
    let store = MemoryStore::default();
    let bytes = build_archive(&[
        ("manifest.json", &manifest_json(&["data.csv"])),
        ("data.csv", "invalid_header\nbad,data"),
    ]);

    let policy = policy();
    let err = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Schema { .. }));
    let inner = store.lock();
    assert!(inner.node_hours.is_empty());
    assert!(inner.pod_hours.is_empty());
}

#[tokio::test]
async fn schema_failure_in_one_of_many_csvs_skips_only_that_file() {
    let store = MemoryStore::default();
    let good_csv = format!(
        "{CSV_HEADER}\n{}",
        report_row("2025-05-17 14:00:00 +0000 UTC", "100", "200", "label_rht_comp:EAP")
    );
    let bytes = build_archive(&[
        ("manifest.json", &manifest_json(&["bad.csv", "good.csv"])),
        ("bad.csv", "invalid_header\nbad,data"),
        ("good.csv", &good_csv),
    ]);

    let policy = policy();
    let report = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    assert_eq!(report.failed_files, vec!["bad.csv".to_string()]);
    assert_eq!(report.rows_processed, 1);
    assert_eq!(store.lock().pod_hours.len(), 1);
}

#[tokio::test]
async fn header_only_csv_writes_nothing_and_succeeds() {
    let store = MemoryStore::default();
    let bytes = build_archive(&[
        ("manifest.json", &manifest_json(&["data.csv"])),
        ("data.csv", CSV_HEADER),
    ]);

    let policy = policy();
    let report = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    assert_eq!(report.rows_processed, 0);
    assert_eq!(report.rows_skipped, 0);
    let inner = store.lock();
    assert!(inner.nodes.is_empty());
    assert!(inner.node_hours.is_empty());
}

#[tokio::test]
async fn unparseable_request_coerces_to_zero() {
    let store = MemoryStore::default();
    let bytes = single_csv_archive(&[report_row(
        "2025-05-17 14:00:00 +0000 UTC",
        "100",
        "not-a-number",
        "label_rht_comp:EAP",
    )]);

    let policy = policy();
    let report = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    assert_eq!(report.rows_processed, 1);

    let inner = store.lock();
    let pod_id = inner.pods[0].id;
    let day = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();

    let pod_hour = inner.pod_hours.get(&(pod_id, ts("2025-05-17 14:00:00 +0000"))).unwrap();
    assert_eq!(pod_hour.request, 0.0);

    // effective seconds fall back to usage alone
    let daily = inner.pod_daily.get(&(pod_id, day)).unwrap();
    assert_eq!(daily.total_effective_core_seconds, 100.0);
}

#[tokio::test]
async fn zero_capacity_yields_zero_effective_usage() {
    let store = MemoryStore::default();
    let row = "2025-05-17 00:00:00 +0000 UTC,2025-05-17 23:59:59 +0000 UTC,\
2025-05-17 14:00:00 +0000 UTC,2025-05-17 15:00:00 +0000 UTC,ip-10-0-1-63.ec2.internal,\
test,zip-1,100,200,300,1000,2000,3000,4,0,17179869184,61729433600,worker,i-09ad6102842b9a786,\
label_rht_comp:EAP"
        .to_string();
    let bytes = single_csv_archive(&[row]);

    let policy = policy();
    RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    let inner = store.lock();
    let pod_id = inner.pods[0].id;
    let day = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();
    let daily = inner.pod_daily.get(&(pod_id, day)).unwrap();
    assert_eq!(daily.max_cores_used, 0.0);
    assert_eq!(daily.total_effective_core_seconds, 200.0);
}

#[tokio::test]
async fn undeclared_csv_members_are_ignored() {
    let store = MemoryStore::default();
    let declared = format!(
        "{CSV_HEADER}\n{}",
        report_row("2025-05-17 14:00:00 +0000 UTC", "100", "200", "label_rht_comp:EAP")
    );
    let undeclared = format!(
        "{CSV_HEADER}\n{}",
        report_row("2025-05-17 15:00:00 +0000 UTC", "999", "999", "label_rht_comp:EAP")
    );
    let bytes = build_archive(&[
        ("manifest.json", &manifest_json(&["declared.csv"])),
        ("declared.csv", &declared),
        ("undeclared.csv", &undeclared),
    ]);

    let policy = policy();
    let report = RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    assert_eq!(report.csv_files, 1);
    let inner = store.lock();
    assert_eq!(inner.pod_hours.len(), 1);
    assert!(inner
        .pod_hours
        .contains_key(&(inner.pods[0].id, ts("2025-05-17 14:00:00 +0000"))));
}

#[tokio::test]
async fn reupload_updates_cluster_name() {
    let store = MemoryStore::default();
    let first = build_archive(&[(
        "manifest.json",
        &serde_json::json!({"cluster_id": CLUSTER_ID, "files": []}).to_string(),
    )]);
    let second = build_archive(&[("manifest.json", &manifest_json(&[]))]);

    let policy = policy();
    let processor = RecordProcessor::new(&store, &policy);
    processor.import_archive(&first).await.unwrap();

    let cluster_id = Uuid::parse_str(CLUSTER_ID).unwrap();
    assert_eq!(
        store.lock().clusters.get(&cluster_id).map(String::as_str),
        Some(CLUSTER_ID)
    );

    processor.import_archive(&second).await.unwrap();
    assert_eq!(
        store.lock().clusters.get(&cluster_id).map(String::as_str),
        Some("test-cluster")
    );
}

#[tokio::test]
async fn nodes_without_resource_id_upsert_by_cluster_and_name() {
    let store = MemoryStore::default();
    let row = |interval: &str| -> String {
        format!(
            "2025-05-17 00:00:00 +0000 UTC,2025-05-17 23:59:59 +0000 UTC,{interval},\
2025-05-17 15:00:00 +0000 UTC,bare-metal-0,test,zip-1,100,200,300,1000,2000,3000,4,14400,\
17179869184,61729433600,,,label_rht_comp:EAP"
        )
    };
    let bytes = single_csv_archive(&[
        row("2025-05-17 14:00:00 +0000 UTC"),
        row("2025-05-17 15:00:00 +0000 UTC"),
    ]);

    let policy = policy();
    RecordProcessor::new(&store, &policy)
        .import_archive(&bytes)
        .await
        .unwrap();

    let inner = store.lock();
    assert_eq!(inner.nodes.len(), 1);
    assert_eq!(inner.nodes[0].identifier, None);
    // blank node_role defaults to worker
    assert_eq!(inner.nodes[0].node_type, "worker");
    assert_eq!(inner.node_hours.len(), 2);
}
