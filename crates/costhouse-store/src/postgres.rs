//! PostgreSQL Metrics Store Implementation
//!
//! Production backend for the [`MetricsStore`] trait using PostgreSQL 14+.
//!
//! ## Conflict Semantics
//!
//! Idempotence lives in the SQL, not in application locks. Every write states
//! its natural key and what happens on conflict:
//!
//! | Table | Key | On conflict |
//! |-------|-----|-------------|
//! | `clusters` | `id` | overwrite `name` |
//! | `nodes` | `identifier`, else `(cluster_id, name)` | overwrite `name`, `cluster_id`, `type` |
//! | `pods` | `(cluster_id, namespace, name)` | overwrite `node_id`, `component` |
//! | `node_metrics` | `(node_id, timestamp)` | do nothing |
//! | `pod_metrics` | `(pod_id, timestamp)` | sum usage/request, replace capacity |
//! | `node_daily_summary` | `(node_id, date, core_count)` | `total_hours + 1` |
//! | `pod_daily_summary` | `(pod_id, date)` | max / sum / `total_hours + 1` |
//!
//! The hourly inserts report whether a row was newly inserted. For
//! `node_metrics` that is `rows_affected` of a `DO NOTHING` insert; for
//! `pod_metrics`, which must merge on conflict, it is the `xmax = 0` system
//! column test on the returned row.
//!
//! ## Connection Pooling
//!
//! A `PgPool` (default 20 connections) is the only shared resource. Each
//! operation checks a connection out for its own duration; no transaction
//! spans more than one statement, so a cancelled or partially re-run import
//! never leaves locks behind.
//!
//! ## Retries
//!
//! Writes are retried once when the failure is transient (connection I/O,
//! pool timeout). Anything else, including a write into an unprovisioned
//! partition, surfaces immediately as a [`StoreError`].

use std::future::Future;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{
    clamp_limit, clamp_offset, NodeDailyFilter, NodeDailySummary, Page, PodDailyFilter,
    PodDailySummary,
};
use crate::MetricsStore;

pub struct PostgresMetricsStore {
    pool: PgPool,
}

impl PostgresMetricsStore {
    /// Connect with default pool options and run pending migrations.
    pub async fn new(url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(url)?;
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Connect with caller-supplied pool options and run pending migrations.
    pub async fn with_pool_options(url: &str, pool_options: PgPoolOptions) -> Result<Self> {
        let options = PgConnectOptions::from_str(url)?;
        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

fn bind_node_filters<'q>(q: PgQuery<'q>, filter: &'q NodeDailyFilter) -> PgQuery<'q> {
    let mut q = q.bind(filter.start).bind(filter.end);
    if let Some(cluster_id) = &filter.cluster_id {
        q = q.bind(cluster_id.as_str());
    }
    if let Some(cluster_name) = &filter.cluster_name {
        q = q.bind(cluster_name.as_str());
    }
    if let Some(node_type) = &filter.node_type {
        q = q.bind(node_type.as_str());
    }
    q
}

fn bind_pod_filters<'q>(q: PgQuery<'q>, filter: &'q PodDailyFilter) -> PgQuery<'q> {
    let mut q = q.bind(filter.start).bind(filter.end);
    if let Some(cluster_id) = &filter.cluster_id {
        q = q.bind(cluster_id.as_str());
    }
    if let Some(cluster_name) = &filter.cluster_name {
        q = q.bind(cluster_name.as_str());
    }
    if let Some(namespace) = &filter.namespace {
        q = q.bind(namespace.as_str());
    }
    if let Some(pod_name) = &filter.pod_name {
        q = q.bind(pod_name.as_str());
    }
    if let Some(component) = &filter.component {
        q = q.bind(component.as_str());
    }
    q
}

/// Run `op`, retrying exactly once if the first attempt fails transiently.
async fn retry_once<T, F, Fut>(op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match op().await {
        Ok(v) => Ok(v),
        Err(e) => {
            let err = StoreError::from(e);
            if err.is_transient() {
                tracing::warn!(error = %err, "transient store error, retrying once");
                Ok(op().await?)
            } else {
                Err(err)
            }
        }
    }
}

#[async_trait]
impl MetricsStore for PostgresMetricsStore {
    async fn upsert_cluster(&self, id: Uuid, name: &str) -> Result<()> {
        retry_once(|| {
            sqlx::query(
                "INSERT INTO clusters (id, name) VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
            )
            .bind(id)
            .bind(name)
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    async fn upsert_node(
        &self,
        cluster_id: Uuid,
        name: &str,
        identifier: Option<&str>,
        node_type: &str,
    ) -> Result<Uuid> {
        let row = match identifier {
            Some(identifier) => {
                retry_once(|| {
                    sqlx::query(
                        "INSERT INTO nodes (id, cluster_id, name, identifier, type)
                         VALUES (gen_random_uuid(), $1, $2, $3, $4)
                         ON CONFLICT (identifier) WHERE identifier IS NOT NULL
                         DO UPDATE SET name = EXCLUDED.name,
                                       cluster_id = EXCLUDED.cluster_id,
                                       type = EXCLUDED.type
                         RETURNING id",
                    )
                    .bind(cluster_id)
                    .bind(name)
                    .bind(identifier)
                    .bind(node_type)
                    .fetch_one(&self.pool)
                })
                .await?
            }
            None => {
                retry_once(|| {
                    sqlx::query(
                        "INSERT INTO nodes (id, cluster_id, name, identifier, type)
                         VALUES (gen_random_uuid(), $1, $2, NULL, $3)
                         ON CONFLICT (cluster_id, name) WHERE identifier IS NULL
                         DO UPDATE SET name = EXCLUDED.name,
                                       type = EXCLUDED.type
                         RETURNING id",
                    )
                    .bind(cluster_id)
                    .bind(name)
                    .bind(node_type)
                    .fetch_one(&self.pool)
                })
                .await?
            }
        };
        Ok(row.get("id"))
    }

    async fn upsert_pod(
        &self,
        cluster_id: Uuid,
        node_id: Uuid,
        name: &str,
        namespace: &str,
        component: &str,
    ) -> Result<Uuid> {
        let row = retry_once(|| {
            sqlx::query(
                "INSERT INTO pods (id, cluster_id, node_id, name, namespace, component)
                 VALUES (gen_random_uuid(), $1, $2, $3, $4, $5)
                 ON CONFLICT (cluster_id, namespace, name)
                 DO UPDATE SET node_id = EXCLUDED.node_id,
                               component = EXCLUDED.component
                 RETURNING id",
            )
            .bind(cluster_id)
            .bind(node_id)
            .bind(name)
            .bind(namespace)
            .bind(component)
            .fetch_one(&self.pool)
        })
        .await?;
        Ok(row.get("id"))
    }

    async fn insert_node_hourly(
        &self,
        node_id: Uuid,
        timestamp: DateTime<Utc>,
        core_count: i32,
        cluster_id: Uuid,
    ) -> Result<bool> {
        let result = retry_once(|| {
            sqlx::query(
                "INSERT INTO node_metrics (node_id, cluster_id, timestamp, core_count)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (node_id, timestamp) DO NOTHING",
            )
            .bind(node_id)
            .bind(cluster_id)
            .bind(timestamp)
            .bind(core_count)
            .execute(&self.pool)
        })
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_pod_hourly(
        &self,
        pod_id: Uuid,
        timestamp: DateTime<Utc>,
        usage_cpu_core_seconds: f64,
        request_cpu_core_seconds: f64,
        node_capacity_cpu_core_seconds: f64,
        node_capacity_cpu_cores: i32,
    ) -> Result<bool> {
        // xmax = 0 distinguishes a fresh insert from a conflict merge.
        let row = retry_once(|| {
            sqlx::query(
                "INSERT INTO pod_metrics
                     (pod_id, timestamp, pod_usage_cpu_core_seconds,
                      pod_request_cpu_core_seconds, node_capacity_cpu_core_seconds,
                      node_capacity_cpu_cores)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (pod_id, timestamp) DO UPDATE SET
                     pod_usage_cpu_core_seconds =
                         pod_metrics.pod_usage_cpu_core_seconds + EXCLUDED.pod_usage_cpu_core_seconds,
                     pod_request_cpu_core_seconds =
                         pod_metrics.pod_request_cpu_core_seconds + EXCLUDED.pod_request_cpu_core_seconds,
                     node_capacity_cpu_core_seconds = EXCLUDED.node_capacity_cpu_core_seconds,
                     node_capacity_cpu_cores = EXCLUDED.node_capacity_cpu_cores
                 RETURNING (xmax = 0) AS inserted",
            )
            .bind(pod_id)
            .bind(timestamp)
            .bind(usage_cpu_core_seconds)
            .bind(request_cpu_core_seconds)
            .bind(node_capacity_cpu_core_seconds)
            .bind(node_capacity_cpu_cores)
            .fetch_one(&self.pool)
        })
        .await?;
        Ok(row.get("inserted"))
    }

    async fn upsert_node_daily(
        &self,
        node_id: Uuid,
        timestamp: DateTime<Utc>,
        core_count: i32,
    ) -> Result<()> {
        let date = timestamp.date_naive();
        retry_once(|| {
            sqlx::query(
                "INSERT INTO node_daily_summary (node_id, date, core_count, total_hours)
                 VALUES ($1, $2, $3, 1)
                 ON CONFLICT (node_id, date, core_count)
                 DO UPDATE SET total_hours = node_daily_summary.total_hours + 1",
            )
            .bind(node_id)
            .bind(date)
            .bind(core_count)
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    async fn upsert_pod_daily(
        &self,
        pod_id: Uuid,
        timestamp: DateTime<Utc>,
        effective_core_seconds: f64,
        effective_core_usage: f64,
    ) -> Result<()> {
        let date = timestamp.date_naive();
        retry_once(|| {
            sqlx::query(
                "INSERT INTO pod_daily_summary
                     (pod_id, date, max_cores_used, total_pod_effective_core_seconds, total_hours)
                 VALUES ($1, $2, $3, $4, 1)
                 ON CONFLICT (pod_id, date) DO UPDATE SET
                     max_cores_used =
                         GREATEST(pod_daily_summary.max_cores_used, EXCLUDED.max_cores_used),
                     total_pod_effective_core_seconds =
                         pod_daily_summary.total_pod_effective_core_seconds
                         + EXCLUDED.total_pod_effective_core_seconds,
                     total_hours = pod_daily_summary.total_hours + 1",
            )
            .bind(pod_id)
            .bind(date)
            .bind(effective_core_usage)
            .bind(effective_core_seconds)
            .execute(&self.pool)
        })
        .await?;
        Ok(())
    }

    async fn query_node_daily(&self, filter: &NodeDailyFilter) -> Result<Page<NodeDailySummary>> {
        let mut where_clause = String::from("WHERE ds.date BETWEEN $1 AND $2");
        let mut argn = 2;
        if filter.cluster_id.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND c.id::text = ${argn}"));
        }
        if filter.cluster_name.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND c.name ILIKE '%' || ${argn} || '%'"));
        }
        if filter.node_type.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND n.type = ${argn}"));
        }

        let from_clause = "FROM node_daily_summary ds
             JOIN nodes n ON ds.node_id = n.id
             JOIN clusters c ON n.cluster_id = c.id";

        let select_sql = format!(
            "SELECT ds.date,
                    c.id AS cluster_id,
                    c.name AS cluster_name,
                    n.name AS node_name,
                    COALESCE(n.identifier, '') AS node_identifier,
                    n.type AS node_type,
                    ds.core_count,
                    ds.total_hours
             {from_clause}
             {where_clause}
             ORDER BY ds.date ASC
             LIMIT ${} OFFSET ${}",
            argn + 1,
            argn + 2
        );
        let count_sql = format!("SELECT COUNT(*) AS total {from_clause} {where_clause}");

        let rows = bind_node_filters(sqlx::query(&select_sql), filter)
            .bind(clamp_limit(filter.limit))
            .bind(clamp_offset(filter.offset))
            .fetch_all(&self.pool)
            .await?;

        let total_row = bind_node_filters(sqlx::query(&count_sql), filter)
            .fetch_one(&self.pool)
            .await?;

        let summaries = rows
            .into_iter()
            .map(|r| NodeDailySummary {
                date: r.get("date"),
                cluster_id: r.get("cluster_id"),
                cluster_name: r.get("cluster_name"),
                node_name: r.get("node_name"),
                node_identifier: r.get("node_identifier"),
                node_type: r.get("node_type"),
                core_count: r.get("core_count"),
                total_hours: r.get("total_hours"),
            })
            .collect();

        Ok(Page {
            rows: summaries,
            total: total_row.get("total"),
        })
    }

    async fn query_pod_daily(&self, filter: &PodDailyFilter) -> Result<Page<PodDailySummary>> {
        let mut where_clause = String::from("WHERE ds.date BETWEEN $1 AND $2");
        let mut argn = 2;
        if filter.cluster_id.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND c.id::text = ${argn}"));
        }
        if filter.cluster_name.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND c.name ILIKE '%' || ${argn} || '%'"));
        }
        if filter.namespace.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND p.namespace ILIKE '%' || ${argn} || '%'"));
        }
        if filter.pod_name.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND p.name ILIKE '%' || ${argn} || '%'"));
        }
        if filter.component.is_some() {
            argn += 1;
            where_clause.push_str(&format!(" AND p.component ILIKE '%' || ${argn} || '%'"));
        }

        let from_clause = "FROM pod_daily_summary ds
             JOIN pods p ON ds.pod_id = p.id
             JOIN clusters c ON p.cluster_id = c.id";

        let select_sql = format!(
            "SELECT ds.date,
                    ds.max_cores_used,
                    ds.total_pod_effective_core_seconds,
                    ds.total_hours,
                    c.id AS cluster_id,
                    c.name AS cluster_name,
                    p.namespace,
                    p.name AS pod_name,
                    COALESCE(p.component, '') AS component
             {from_clause}
             {where_clause}
             ORDER BY ds.date ASC
             LIMIT ${} OFFSET ${}",
            argn + 1,
            argn + 2
        );
        let count_sql = format!("SELECT COUNT(*) AS total {from_clause} {where_clause}");

        let rows = bind_pod_filters(sqlx::query(&select_sql), filter)
            .bind(clamp_limit(filter.limit))
            .bind(clamp_offset(filter.offset))
            .fetch_all(&self.pool)
            .await?;

        let total_row = bind_pod_filters(sqlx::query(&count_sql), filter)
            .fetch_one(&self.pool)
            .await?;

        let summaries = rows
            .into_iter()
            .map(|r| PodDailySummary {
                date: r.get("date"),
                max_cores_used: r.get("max_cores_used"),
                total_pod_effective_core_seconds: r.get("total_pod_effective_core_seconds"),
                total_hours: r.get("total_hours"),
                cluster_id: r.get("cluster_id"),
                cluster_name: r.get("cluster_name"),
                namespace: r.get("namespace"),
                pod_name: r.get("pod_name"),
                component: r.get("component"),
            })
            .collect();

        Ok(Page {
            rows: summaries,
            total: total_row.get("total"),
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
