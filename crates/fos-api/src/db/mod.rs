//! # Database Persistence Layer
//!
//! Optional Postgres persistence for the directory via SQLx.
//!
//! ## Architecture
//!
//! The in-memory stores are canonical at runtime. When `DATABASE_URL` is
//! set, every accepted write is mirrored to Postgres and the stores are
//! hydrated from it once on startup; reads never touch the database. When
//! the variable is absent, the API runs in-memory only (suitable for
//! development and testing).
//!
//! ## Schema
//!
//! One table per store: `users`, `customers`, `sites`, `work_orders`,
//! `work_packages`, `tasks`, `evidence`, `visits`. The tables are assumed
//! to be provisioned by the deployment; this layer connects and verifies
//! the connection but does not manage schema.
//!
//! Roles and statuses are stored as their wire strings. Hydration parses
//! them back through the `fos-core` `FromStr` impls and skips rows that no
//! longer parse, with a logged warning, rather than refusing to start.

pub mod customers;
pub mod sites;
pub mod tasks;
pub mod users;
pub mod visits;
pub mod work_orders;
pub mod work_packages;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or the liveness
/// query fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set; running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("Connected to PostgreSQL");

    Ok(Some(pool))
}
