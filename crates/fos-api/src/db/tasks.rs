//! Task and evidence persistence operations.
//!
//! Functions here operate on the `tasks` and `evidence` tables. Evidence
//! rides with tasks because its lifecycle is bound to them: evidence is
//! append-only and only ever queried per task.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use fos_core::TaskStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::{EvidenceRecord, TaskRecord};

/// Insert a new task record.
pub async fn insert(pool: &PgPool, record: &TaskRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tasks (id, org_id, work_order_id, work_package_id, title, status,
         is_critical, requires_evidence, assigned_to, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(record.work_order_id)
    .bind(record.work_package_id)
    .bind(&record.title)
    .bind(record.status.as_str())
    .bind(record.is_critical)
    .bind(record.requires_evidence)
    .bind(record.assigned_to)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update a task's status.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: TaskStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE tasks SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .bind(updated_at)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Insert a new evidence record.
pub async fn insert_evidence(pool: &PgPool, record: &EvidenceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO evidence (id, org_id, task_id, author_id, note, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(record.task_id)
    .bind(record.author_id)
    .bind(&record.note)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all tasks from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<TaskRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TaskRow>(
        "SELECT id, org_id, work_order_id, work_package_id, title, status,
         is_critical, requires_evidence, assigned_to, created_at, updated_at
         FROM tasks ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(TaskRow::into_record).collect())
}

/// Load all evidence records from the database on startup.
pub async fn load_all_evidence(pool: &PgPool) -> Result<Vec<EvidenceRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EvidenceRow>(
        "SELECT id, org_id, task_id, author_id, note, created_at
         FROM evidence ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(EvidenceRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    org_id: Uuid,
    work_order_id: Uuid,
    work_package_id: Option<Uuid>,
    title: String,
    status: String,
    is_critical: bool,
    requires_evidence: bool,
    assigned_to: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn into_record(self) -> Option<TaskRecord> {
        let status = match TaskStatus::from_str(&self.status) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(task_id = %self.id, error = %e, "skipping task row with unparseable status");
                return None;
            }
        };
        Some(TaskRecord {
            id: self.id,
            org_id: self.org_id,
            work_order_id: self.work_order_id,
            work_package_id: self.work_package_id,
            title: self.title,
            status,
            is_critical: self.is_critical,
            requires_evidence: self.requires_evidence,
            assigned_to: self.assigned_to,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct EvidenceRow {
    id: Uuid,
    org_id: Uuid,
    task_id: Uuid,
    author_id: Uuid,
    note: String,
    created_at: DateTime<Utc>,
}

impl EvidenceRow {
    fn into_record(self) -> EvidenceRecord {
        EvidenceRecord {
            id: self.id,
            org_id: self.org_id,
            task_id: self.task_id,
            author_id: self.author_id,
            note: self.note,
            created_at: self.created_at,
        }
    }
}
