//! Site persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `sites` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::SiteRecord;

/// Insert a new site record.
pub async fn insert(pool: &PgPool, record: &SiteRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sites (id, org_id, customer_id, label, address, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(record.customer_id)
    .bind(&record.label)
    .bind(&record.address)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all sites from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<SiteRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SiteRow>(
        "SELECT id, org_id, customer_id, label, address, created_at
         FROM sites ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SiteRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SiteRow {
    id: Uuid,
    org_id: Uuid,
    customer_id: Uuid,
    label: String,
    address: String,
    created_at: DateTime<Utc>,
}

impl SiteRow {
    fn into_record(self) -> SiteRecord {
        SiteRecord {
            id: self.id,
            org_id: self.org_id,
            customer_id: self.customer_id,
            label: self.label,
            address: self.address,
            created_at: self.created_at,
        }
    }
}
