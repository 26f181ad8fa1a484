//! # Tasks — Units of Work and of Gating
//!
//! ## Endpoints
//!
//! - `POST /v1/tasks` — create task (dispatcher or admin)
//! - `GET /v1/tasks` — list tasks in scope
//! - `GET /v1/tasks/:id` — get task
//! - `POST /v1/tasks/:id/status` — update task status (anyone with scope)
//! - `POST /v1/tasks/:id/evidence` — attach evidence (anyone with scope)
//! - `GET /v1/tasks/:id/evidence` — list a task's evidence
//!
//! Status updates and evidence have no role floor: a technician who can
//! see a task can work it. Scope is the whole check.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use fos_core::{Role, TaskStatus};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, Caller};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::{AppState, EvidenceRecord, TaskRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// Work order this task belongs to.
    pub work_order_id: Uuid,
    /// Optional work package grouping within the work order.
    pub work_package_id: Option<Uuid>,
    /// Task title.
    pub title: String,
    /// Whether closeout requires this task to be DONE.
    #[serde(default)]
    pub is_critical: bool,
    /// Whether closeout requires evidence on this task.
    #[serde(default)]
    pub requires_evidence: bool,
    /// Optional technician assignment.
    pub assigned_to: Option<Uuid>,
}

impl Validate for CreateTaskRequest {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to update a task's status.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskStatusRequest {
    /// New status in wire form, e.g. `IN_PROGRESS` or `DONE`.
    pub status: TaskStatus,
}

/// Request to attach an evidence record to a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEvidenceRequest {
    /// Human-readable note; what was observed or measured.
    pub note: String,
}

impl Validate for CreateEvidenceRequest {
    fn validate(&self) -> Result<(), String> {
        if self.note.trim().is_empty() {
            return Err("note must not be empty".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the tasks router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/tasks", get(list_tasks).post(create_task))
        .route("/v1/tasks/:id", get(get_task))
        .route("/v1/tasks/:id/status", axum::routing::post(update_task_status))
        .route(
            "/v1/tasks/:id/evidence",
            get(list_evidence).post(create_evidence),
        )
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/tasks — Create a new task.
#[utoipa::path(
    post,
    path = "/v1/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskRecord),
        (status = 403, description = "Caller role cannot create tasks", body = crate::error::ErrorBody),
        (status = 404, description = "Work order, work package, or assignee not found or not in scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "tasks"
)]
async fn create_task(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<TaskRecord>), AppError> {
    require_role(&caller, Role::Dispatcher)?;
    let req = extract_validated_json(body)?;

    let order = state
        .scoped_work_order(&caller, &req.work_order_id)
        .ok_or_else(|| AppError::not_found("work order"))?;
    if let Some(package_id) = req.work_package_id {
        let package = state
            .scoped_work_package(&caller, &package_id)
            .ok_or_else(|| AppError::not_found("work package"))?;
        if package.work_order_id != order.id {
            return Err(AppError::Validation(
                "work package does not belong to the named work order".to_string(),
            ));
        }
    }
    if let Some(assignee) = req.assigned_to {
        state
            .org_user(&caller, &assignee)
            .ok_or_else(|| AppError::not_found("user"))?;
    }

    let now = Utc::now();
    let record = TaskRecord {
        id: Uuid::new_v4(),
        org_id: order.org_id,
        work_order_id: order.id,
        work_package_id: req.work_package_id,
        title: req.title,
        status: TaskStatus::Todo,
        is_critical: req.is_critical,
        requires_evidence: req.requires_evidence,
        assigned_to: req.assigned_to,
        created_at: now,
        updated_at: now,
    };

    state.tasks.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::tasks::insert(pool, &record).await {
            tracing::error!(task_id = %record.id, error = %e, "failed to persist task to database");
            return Err(AppError::Internal(
                "task created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/tasks — List tasks visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/tasks",
    responses(
        (status = 200, description = "Tasks in the caller's scope", body = Vec<TaskRecord>),
    ),
    tag = "tasks"
)]
async fn list_tasks(State(state): State<AppState>, caller: Caller) -> Json<Vec<TaskRecord>> {
    Json(state.scoped_tasks(&caller))
}

/// GET /v1/tasks/:id — Get a single task.
#[utoipa::path(
    get,
    path = "/v1/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = TaskRecord),
        (status = 404, description = "Task not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "tasks"
)]
async fn get_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskRecord>, AppError> {
    state
        .scoped_task(&caller, &id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("task"))
}

/// POST /v1/tasks/:id/status — Update a task's status.
#[utoipa::path(
    post,
    path = "/v1/tasks/{id}/status",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = UpdateTaskStatusRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskRecord),
        (status = 404, description = "Task not found or not in scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "tasks"
)]
async fn update_task_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateTaskStatusRequest>, JsonRejection>,
) -> Result<Json<TaskRecord>, AppError> {
    let req = extract_json(body)?;

    state
        .scoped_task(&caller, &id)
        .ok_or_else(|| AppError::not_found("task"))?;

    let now = Utc::now();
    let record = state
        .tasks
        .update(&id, |task| {
            task.status = req.status;
            task.updated_at = now;
        })
        .ok_or_else(|| AppError::not_found("task"))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::tasks::update_status(pool, id, req.status, now).await {
            tracing::error!(task_id = %id, error = %e, "failed to persist task status to database");
            return Err(AppError::Internal(
                "task updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(record))
}

/// POST /v1/tasks/:id/evidence — Attach an evidence record to a task.
#[utoipa::path(
    post,
    path = "/v1/tasks/{id}/evidence",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = CreateEvidenceRequest,
    responses(
        (status = 201, description = "Evidence recorded", body = EvidenceRecord),
        (status = 404, description = "Task not found or not in scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "tasks"
)]
async fn create_evidence(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<CreateEvidenceRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<EvidenceRecord>), AppError> {
    let req = extract_validated_json(body)?;

    let task = state
        .scoped_task(&caller, &id)
        .ok_or_else(|| AppError::not_found("task"))?;

    let record = EvidenceRecord {
        id: Uuid::new_v4(),
        org_id: task.org_id,
        task_id: task.id,
        author_id: *caller.user_id.as_uuid(),
        note: req.note,
        created_at: Utc::now(),
    };

    state.evidence.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::tasks::insert_evidence(pool, &record).await {
            tracing::error!(evidence_id = %record.id, error = %e, "failed to persist evidence to database");
            return Err(AppError::Internal(
                "evidence recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/tasks/:id/evidence — List a task's evidence records.
#[utoipa::path(
    get,
    path = "/v1/tasks/{id}/evidence",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Evidence records, oldest first", body = Vec<EvidenceRecord>),
        (status = 404, description = "Task not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "tasks"
)]
async fn list_evidence(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EvidenceRecord>>, AppError> {
    state
        .scoped_task_evidence(&caller, &id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("task"))
}
