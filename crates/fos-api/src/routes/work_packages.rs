//! # Work Packages — Task Groupings Under a Work Order
//!
//! ## Endpoints
//!
//! - `POST /v1/work-packages` — create work package (dispatcher or admin)
//! - `GET /v1/work-packages` — list work packages in scope
//! - `GET /v1/work-packages/:id` — get work package
//!
//! A package may name a lead technician. Leading a package grants that
//! technician reach over the package, its tasks, and its work order, but
//! not over visits.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use fos_core::Role;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, Caller};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, WorkPackageRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new work package.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorkPackageRequest {
    /// Work order this package belongs to.
    pub work_order_id: Uuid,
    /// Package title.
    pub title: String,
    /// Optional lead technician.
    pub lead_tech_id: Option<Uuid>,
}

impl Validate for CreateWorkPackageRequest {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the work packages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/work-packages",
            get(list_work_packages).post(create_work_package),
        )
        .route("/v1/work-packages/:id", get(get_work_package))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/work-packages — Create a new work package.
#[utoipa::path(
    post,
    path = "/v1/work-packages",
    request_body = CreateWorkPackageRequest,
    responses(
        (status = 201, description = "Work package created", body = WorkPackageRecord),
        (status = 403, description = "Caller role cannot create work packages", body = crate::error::ErrorBody),
        (status = 404, description = "Work order or lead technician not found or not in scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "work_packages"
)]
async fn create_work_package(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateWorkPackageRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<WorkPackageRecord>), AppError> {
    require_role(&caller, Role::Dispatcher)?;
    let req = extract_validated_json(body)?;

    let order = state
        .scoped_work_order(&caller, &req.work_order_id)
        .ok_or_else(|| AppError::not_found("work order"))?;
    if let Some(lead) = req.lead_tech_id {
        state
            .org_user(&caller, &lead)
            .ok_or_else(|| AppError::not_found("user"))?;
    }

    let record = WorkPackageRecord {
        id: Uuid::new_v4(),
        org_id: order.org_id,
        work_order_id: order.id,
        title: req.title,
        lead_tech_id: req.lead_tech_id,
        created_at: Utc::now(),
    };

    state.work_packages.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::work_packages::insert(pool, &record).await {
            tracing::error!(work_package_id = %record.id, error = %e, "failed to persist work package to database");
            return Err(AppError::Internal(
                "work package created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/work-packages — List work packages visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/work-packages",
    responses(
        (status = 200, description = "Work packages in the caller's scope", body = Vec<WorkPackageRecord>),
    ),
    tag = "work_packages"
)]
async fn list_work_packages(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<Vec<WorkPackageRecord>> {
    Json(state.scoped_work_packages(&caller))
}

/// GET /v1/work-packages/:id — Get a single work package.
#[utoipa::path(
    get,
    path = "/v1/work-packages/{id}",
    params(("id" = Uuid, Path, description = "Work package ID")),
    responses(
        (status = 200, description = "Work package found", body = WorkPackageRecord),
        (status = 404, description = "Work package not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "work_packages"
)]
async fn get_work_package(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkPackageRecord>, AppError> {
    state
        .scoped_work_package(&caller, &id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("work package"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_work_package_request_valid() {
        let req = CreateWorkPackageRequest {
            work_order_id: Uuid::new_v4(),
            title: "Electrical checks".to_string(),
            lead_tech_id: Some(Uuid::new_v4()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_work_package_request_without_lead() {
        let req = CreateWorkPackageRequest {
            work_order_id: Uuid::new_v4(),
            title: "Electrical checks".to_string(),
            lead_tech_id: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_work_package_request_empty_title() {
        let req = CreateWorkPackageRequest {
            work_order_id: Uuid::new_v4(),
            title: "  ".to_string(),
            lead_tech_id: None,
        };
        let err = req.validate().unwrap_err();
        assert!(err.contains("title"), "error should mention title: {err}");
    }
}
