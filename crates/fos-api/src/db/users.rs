//! User persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `users` table.
//! Users are immutable once created; there are no update operations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use fos_core::Role;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::UserRecord;

/// Insert a new user record.
pub async fn insert(pool: &PgPool, record: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, org_id, display_name, email, role, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.org_id)
    .bind(&record.display_name)
    .bind(&record.email)
    .bind(record.role.as_str())
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all users from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, org_id, display_name, email, role, created_at
         FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(UserRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    org_id: Uuid,
    display_name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_record(self) -> Option<UserRecord> {
        let role = match Role::from_str(&self.role) {
            Ok(role) => role,
            Err(e) => {
                // Never widen an unrecognized role into a default.
                tracing::error!(user_id = %self.id, error = %e, "skipping user row with unparseable role");
                return None;
            }
        };
        Some(UserRecord {
            id: self.id,
            org_id: self.org_id,
            display_name: self.display_name,
            email: self.email,
            role,
            created_at: self.created_at,
        })
    }
}
