//! Visit persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `visits` table.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use fos_core::VisitStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::VisitRecord;

/// Insert a new visit record.
pub async fn insert(pool: &PgPool, record: &VisitRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO visits (id, org_id, work_order_id, assigned_tech_id, status,
         scheduled_for, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(record.work_order_id)
    .bind(record.assigned_tech_id)
    .bind(record.status.as_str())
    .bind(record.scheduled_for)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update a visit's status. Used by closeout to record the COMPLETED transition.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: VisitStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE visits SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .bind(updated_at)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all visits from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<VisitRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VisitRow>(
        "SELECT id, org_id, work_order_id, assigned_tech_id, status, scheduled_for,
         created_at, updated_at
         FROM visits ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(VisitRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct VisitRow {
    id: Uuid,
    org_id: Uuid,
    work_order_id: Uuid,
    assigned_tech_id: Option<Uuid>,
    status: String,
    scheduled_for: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VisitRow {
    fn into_record(self) -> Option<VisitRecord> {
        let status = match VisitStatus::from_str(&self.status) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(visit_id = %self.id, error = %e, "skipping visit row with unparseable status");
                return None;
            }
        };
        Some(VisitRecord {
            id: self.id,
            org_id: self.org_id,
            work_order_id: self.work_order_id,
            assigned_tech_id: self.assigned_tech_id,
            status,
            scheduled_for: self.scheduled_for,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
