//! Work order persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `work_orders` table.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use fos_core::WorkOrderStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::WorkOrderRecord;

/// Insert a new work order record.
pub async fn insert(pool: &PgPool, record: &WorkOrderRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO work_orders (id, org_id, customer_id, site_id, title, status,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(record.customer_id)
    .bind(record.site_id)
    .bind(&record.title)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all work orders from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<WorkOrderRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, WorkOrderRow>(
        "SELECT id, org_id, customer_id, site_id, title, status, created_at, updated_at
         FROM work_orders ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(WorkOrderRow::into_record)
        .collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct WorkOrderRow {
    id: Uuid,
    org_id: Uuid,
    customer_id: Uuid,
    site_id: Uuid,
    title: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkOrderRow {
    fn into_record(self) -> Option<WorkOrderRecord> {
        let status = match WorkOrderStatus::from_str(&self.status) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(work_order_id = %self.id, error = %e, "skipping work order row with unparseable status");
                return None;
            }
        };
        Some(WorkOrderRecord {
            id: self.id,
            org_id: self.org_id,
            customer_id: self.customer_id,
            site_id: self.site_id,
            title: self.title,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
