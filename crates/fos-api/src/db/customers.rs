//! Customer persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `customers` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::CustomerRecord;

/// Insert a new customer record.
pub async fn insert(pool: &PgPool, record: &CustomerRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO customers (id, org_id, name, contact_email, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(&record.name)
    .bind(&record.contact_email)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all customers from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<CustomerRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, org_id, name, contact_email, created_at
         FROM customers ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CustomerRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    org_id: Uuid,
    name: String,
    contact_email: Option<String>,
    created_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_record(self) -> CustomerRecord {
        CustomerRecord {
            id: self.id,
            org_id: self.org_id,
            name: self.name,
            contact_email: self.contact_email,
            created_at: self.created_at,
        }
    }
}
