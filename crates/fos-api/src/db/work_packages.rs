//! Work package persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `work_packages` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::WorkPackageRecord;

/// Insert a new work package record.
pub async fn insert(pool: &PgPool, record: &WorkPackageRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO work_packages (id, org_id, work_order_id, title, lead_tech_id, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(record.work_order_id)
    .bind(&record.title)
    .bind(record.lead_tech_id)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all work packages from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<WorkPackageRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, WorkPackageRow>(
        "SELECT id, org_id, work_order_id, title, lead_tech_id, created_at
         FROM work_packages ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(WorkPackageRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct WorkPackageRow {
    id: Uuid,
    org_id: Uuid,
    work_order_id: Uuid,
    title: String,
    lead_tech_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl WorkPackageRow {
    fn into_record(self) -> WorkPackageRecord {
        WorkPackageRecord {
            id: self.id,
            org_id: self.org_id,
            work_order_id: self.work_order_id,
            title: self.title,
            lead_tech_id: self.lead_tech_id,
            created_at: self.created_at,
        }
    }
}
