//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! AppState holds the org-scoped directory the API serves:
//! - **Users** — org members with roles (directory of principals)
//! - **Customers / Sites** — who the work is for and where it happens
//! - **Work Orders / Work Packages / Tasks** — the work breakdown
//! - **Visits** — scheduled technician appearances, gated on closeout
//! - **Evidence** — records attached to tasks; existence satisfies gating
//!
//! The in-memory stores are the read path for every request. When a
//! Postgres pool is configured, writes are mirrored to it and the stores
//! are hydrated from it once on startup; the database is never queried
//! per request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fos_core::{Role, TaskStatus, VisitStatus, WorkOrderStatus};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable, so a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Clone the records satisfying `pred`.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Test whether any record satisfies `pred`, without cloning.
    ///
    /// Short-circuits on the first match, which makes it the existence
    /// check used for evidence gating.
    pub fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.data.read().values().any(|v| pred(v))
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives a `&mut T` and may inspect the current state,
    /// validate preconditions, mutate the record, and return `Ok(R)` or
    /// `Err(E)`. The entire operation runs under a single write lock,
    /// eliminating TOCTOU races between read and update.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Directory Record Types -----------------------------------------------------
//
// API-layer representations. Identifiers are plain UUIDs here; the typed
// wrappers from fos-core appear where records cross into fos-access and
// fos-gate.

/// Org member record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub display_name: String,
    pub email: String,
    /// Role within the organization. Stored rows carry the wire string;
    /// parsing back through `Role::from_str` happens at the db layer.
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Customer account record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Service location record. Belongs to a customer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SiteRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub customer_id: Uuid,
    pub label: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Work order record. The root of the work breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub customer_id: Uuid,
    pub site_id: Uuid,
    pub title: String,
    pub status: WorkOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Work package record. Groups tasks within a work order; optionally led
/// by a technician, which grants that technician reach over the package
/// and its tasks.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkPackageRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub work_order_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_tech_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Task record. The unit of gating: `is_critical` demands `DONE`,
/// `requires_evidence` demands at least one evidence record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub work_order_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_package_id: Option<Uuid>,
    pub title: String,
    pub status: TaskStatus,
    pub is_critical: bool,
    pub requires_evidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Evidence record attached to a task. Existence is what gating checks;
/// the note content is for humans.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvidenceRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Visit record. Closeout transitions `status` to `COMPLETED`, gated by
/// the parent work order's qualifying tasks.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisitRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub work_order_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_tech_id: Option<Uuid>,
    pub status: VisitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Application State --------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret for authentication.
    /// If `None`, secret verification is disabled (development mode).
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Contains the directory stores, the optional Postgres pool for
/// write-through persistence, and application configuration.
/// Clone-friendly via `Arc` internals in each `Store`.
///
/// Scope filters are interpreted over these stores in exactly one place,
/// the accessors in [`crate::scope`]. Handlers never hand-roll role checks
/// against raw store contents.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Store<UserRecord>,
    pub customers: Store<CustomerRecord>,
    pub sites: Store<SiteRecord>,
    pub work_orders: Store<WorkOrderRecord>,
    pub work_packages: Store<WorkPackageRecord>,
    pub tasks: Store<TaskRecord>,
    pub evidence: Store<EvidenceRecord>,
    pub visits: Store<VisitRecord>,

    // -- Database persistence (optional) --
    /// PostgreSQL connection pool for durable persistence.
    /// When `Some`, every write is mirrored to Postgres and the stores are
    /// hydrated from it on startup. When `None`, the API operates in
    /// in-memory-only mode.
    pub db_pool: Option<PgPool>,

    // -- Configuration --
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with default configuration and no database.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a new application state with the given configuration and
    /// optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            users: Store::new(),
            customers: Store::new(),
            sites: Store::new(),
            work_orders: Store::new(),
            work_packages: Store::new(),
            tasks: Store::new(),
            evidence: Store::new(),
            visits: Store::new(),
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available. Loads all
    /// persisted records into the in-memory stores so that read operations
    /// remain fast and synchronous.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = crate::db::users::load_all(pool)
            .await
            .map_err(|e| format!("failed to load users: {e}"))?;
        let user_count = users.len();
        for record in users {
            self.users.insert(record.id, record);
        }

        let customers = crate::db::customers::load_all(pool)
            .await
            .map_err(|e| format!("failed to load customers: {e}"))?;
        let customer_count = customers.len();
        for record in customers {
            self.customers.insert(record.id, record);
        }

        let sites = crate::db::sites::load_all(pool)
            .await
            .map_err(|e| format!("failed to load sites: {e}"))?;
        let site_count = sites.len();
        for record in sites {
            self.sites.insert(record.id, record);
        }

        let work_orders = crate::db::work_orders::load_all(pool)
            .await
            .map_err(|e| format!("failed to load work orders: {e}"))?;
        let work_order_count = work_orders.len();
        for record in work_orders {
            self.work_orders.insert(record.id, record);
        }

        let work_packages = crate::db::work_packages::load_all(pool)
            .await
            .map_err(|e| format!("failed to load work packages: {e}"))?;
        let work_package_count = work_packages.len();
        for record in work_packages {
            self.work_packages.insert(record.id, record);
        }

        let tasks = crate::db::tasks::load_all(pool)
            .await
            .map_err(|e| format!("failed to load tasks: {e}"))?;
        let task_count = tasks.len();
        for record in tasks {
            self.tasks.insert(record.id, record);
        }

        let evidence = crate::db::tasks::load_all_evidence(pool)
            .await
            .map_err(|e| format!("failed to load evidence: {e}"))?;
        let evidence_count = evidence.len();
        for record in evidence {
            self.evidence.insert(record.id, record);
        }

        let visits = crate::db::visits::load_all(pool)
            .await
            .map_err(|e| format!("failed to load visits: {e}"))?;
        let visit_count = visits.len();
        for record in visits {
            self.visits.insert(record.id, record);
        }

        tracing::info!(
            users = user_count,
            customers = customer_count,
            sites = site_count,
            work_orders = work_order_count,
            work_packages = work_package_count,
            tasks = task_count,
            evidence = evidence_count,
            visits = visit_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
