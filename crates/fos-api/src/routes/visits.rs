//! # Visits — Scheduled Appearances and Closeout
//!
//! ## Endpoints
//!
//! - `POST /v1/visits` — create visit (dispatcher or admin)
//! - `GET /v1/visits` — list visits in scope
//! - `GET /v1/visits/:id` — get visit
//! - `GET /v1/visits/:id/closeout-gate` — evaluate the closeout gate
//! - `POST /v1/visits/:id/close` — close the visit if the gate allows
//!
//! The gate endpoint is read-only and idempotent: it reports whether the
//! visit could be closed right now and itemizes every blocker. Closing
//! re-evaluates the same gate and transitions the visit to COMPLETED only
//! when no blockers remain. The evaluate-then-update composition is not
//! atomic; the status transition revalidates under its own lock, and a
//! gate answer is a statement about the moment it was computed.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use fos_core::{Role, VisitId, VisitStatus};
use fos_gate::{evaluate_closeout_gate, GateResult};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, Caller};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::{AppState, VisitRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new visit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVisitRequest {
    /// Work order the visit executes.
    pub work_order_id: Uuid,
    /// Optional technician assignment. Only the assigned technician can
    /// see the visit from a TECH principal.
    pub assigned_tech_id: Option<Uuid>,
    /// Optional scheduled start time.
    pub scheduled_for: Option<DateTime<Utc>>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the visits router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/visits", get(list_visits).post(create_visit))
        .route("/v1/visits/:id", get(get_visit))
        .route("/v1/visits/:id/closeout-gate", get(closeout_gate))
        .route("/v1/visits/:id/close", axum::routing::post(close_visit))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/visits — Create a new visit.
#[utoipa::path(
    post,
    path = "/v1/visits",
    request_body = CreateVisitRequest,
    responses(
        (status = 201, description = "Visit created", body = VisitRecord),
        (status = 403, description = "Caller role cannot create visits", body = crate::error::ErrorBody),
        (status = 404, description = "Work order or technician not found or not in scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "visits"
)]
async fn create_visit(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateVisitRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<VisitRecord>), AppError> {
    require_role(&caller, Role::Dispatcher)?;
    let req = extract_json(body)?;

    let order = state
        .scoped_work_order(&caller, &req.work_order_id)
        .ok_or_else(|| AppError::not_found("work order"))?;
    if let Some(tech) = req.assigned_tech_id {
        state
            .org_user(&caller, &tech)
            .ok_or_else(|| AppError::not_found("user"))?;
    }

    let now = Utc::now();
    let record = VisitRecord {
        id: Uuid::new_v4(),
        org_id: order.org_id,
        work_order_id: order.id,
        assigned_tech_id: req.assigned_tech_id,
        status: VisitStatus::Scheduled,
        scheduled_for: req.scheduled_for,
        created_at: now,
        updated_at: now,
    };

    state.visits.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::visits::insert(pool, &record).await {
            tracing::error!(visit_id = %record.id, error = %e, "failed to persist visit to database");
            return Err(AppError::Internal(
                "visit created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/visits — List visits visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/visits",
    responses(
        (status = 200, description = "Visits in the caller's scope", body = Vec<VisitRecord>),
    ),
    tag = "visits"
)]
async fn list_visits(State(state): State<AppState>, caller: Caller) -> Json<Vec<VisitRecord>> {
    Json(state.scoped_visits(&caller))
}

/// GET /v1/visits/:id — Get a single visit.
#[utoipa::path(
    get,
    path = "/v1/visits/{id}",
    params(("id" = Uuid, Path, description = "Visit ID")),
    responses(
        (status = 200, description = "Visit found", body = VisitRecord),
        (status = 404, description = "Visit not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "visits"
)]
async fn get_visit(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitRecord>, AppError> {
    state
        .scoped_visit(&caller, &id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("visit"))
}

/// GET /v1/visits/:id/closeout-gate — Evaluate the closeout gate.
///
/// Pure read: reports `can_closeout`, itemized blockers, and the summary
/// tallies. Evaluating twice against unchanged records returns an
/// identical result.
#[utoipa::path(
    get,
    path = "/v1/visits/{id}/closeout-gate",
    params(("id" = Uuid, Path, description = "Visit ID")),
    responses(
        (status = 200, description = "Gate evaluated", body = GateResult),
        (status = 404, description = "Visit not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "visits"
)]
async fn closeout_gate(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<GateResult>, AppError> {
    let result = evaluate_closeout_gate(&caller, &VisitId::from_uuid(id), &state)?;
    Ok(Json(result))
}

/// POST /v1/visits/:id/close — Close the visit if the gate allows.
#[utoipa::path(
    post,
    path = "/v1/visits/{id}/close",
    params(("id" = Uuid, Path, description = "Visit ID")),
    responses(
        (status = 200, description = "Visit closed", body = VisitRecord),
        (status = 404, description = "Visit not found or not in scope", body = crate::error::ErrorBody),
        (status = 409, description = "Gate blocked or visit already terminal", body = crate::error::ErrorBody),
    ),
    tag = "visits"
)]
async fn close_visit(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitRecord>, AppError> {
    let gate = evaluate_closeout_gate(&caller, &VisitId::from_uuid(id), &state)?;
    if !gate.can_closeout {
        return Err(AppError::Conflict(format!(
            "closeout blocked by {} blocker(s)",
            gate.blockers.len()
        )));
    }

    let now = Utc::now();
    let record = state
        .visits
        .try_update(&id, |visit| {
            if visit.status.is_terminal() {
                return Err(AppError::Conflict(format!(
                    "visit is already {}",
                    visit.status
                )));
            }
            visit.status = VisitStatus::Completed;
            visit.updated_at = now;
            Ok(visit.clone())
        })
        .ok_or_else(|| AppError::not_found("visit"))??;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::visits::update_status(pool, id, VisitStatus::Completed, now).await
        {
            tracing::error!(visit_id = %id, error = %e, "failed to persist visit closure to database");
            return Err(AppError::Internal(
                "visit closed in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_visit_request_parses_minimal_body() {
        let req: CreateVisitRequest = serde_json::from_str(&format!(
            r#"{{"work_order_id":"{}"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(req.assigned_tech_id.is_none());
        assert!(req.scheduled_for.is_none());
    }

    #[test]
    fn create_visit_request_parses_full_body() {
        let req: CreateVisitRequest = serde_json::from_str(&format!(
            r#"{{"work_order_id":"{}","assigned_tech_id":"{}","scheduled_for":"2024-06-01T09:00:00Z"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(req.assigned_tech_id.is_some());
        assert_eq!(
            req.scheduled_for.unwrap().to_rfc3339(),
            "2024-06-01T09:00:00+00:00"
        );
    }
}
