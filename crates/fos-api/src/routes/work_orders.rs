//! # Work Orders — The Root of the Work Breakdown
//!
//! ## Endpoints
//!
//! - `POST /v1/work-orders` — create work order (dispatcher or admin)
//! - `GET /v1/work-orders` — list work orders in scope
//! - `GET /v1/work-orders/:id` — get work order
//!
//! Technicians see a work order when something on it is theirs: an
//! assigned task, an assigned visit, or a work package they lead.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use fos_core::{Role, WorkOrderStatus};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, Caller};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, WorkOrderRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new work order.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorkOrderRequest {
    /// Customer the work is for.
    pub customer_id: Uuid,
    /// Site where the work happens.
    pub site_id: Uuid,
    /// Work order title.
    pub title: String,
}

impl Validate for CreateWorkOrderRequest {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the work orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/work-orders",
            get(list_work_orders).post(create_work_order),
        )
        .route("/v1/work-orders/:id", get(get_work_order))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/work-orders — Create a new work order.
///
/// Both parent references resolve through the caller's scope, and the
/// site must belong to the named customer.
#[utoipa::path(
    post,
    path = "/v1/work-orders",
    request_body = CreateWorkOrderRequest,
    responses(
        (status = 201, description = "Work order created", body = WorkOrderRecord),
        (status = 403, description = "Caller role cannot create work orders", body = crate::error::ErrorBody),
        (status = 404, description = "Customer or site not found or not in scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "work_orders"
)]
async fn create_work_order(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateWorkOrderRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<WorkOrderRecord>), AppError> {
    require_role(&caller, Role::Dispatcher)?;
    let req = extract_validated_json(body)?;

    let customer = state
        .scoped_customer(&caller, &req.customer_id)
        .ok_or_else(|| AppError::not_found("customer"))?;
    let site = state
        .scoped_site(&caller, &req.site_id)
        .ok_or_else(|| AppError::not_found("site"))?;
    if site.customer_id != customer.id {
        return Err(AppError::Validation(
            "site does not belong to the named customer".to_string(),
        ));
    }

    let now = Utc::now();
    let record = WorkOrderRecord {
        id: Uuid::new_v4(),
        org_id: customer.org_id,
        customer_id: customer.id,
        site_id: site.id,
        title: req.title,
        status: WorkOrderStatus::Open,
        created_at: now,
        updated_at: now,
    };

    state.work_orders.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::work_orders::insert(pool, &record).await {
            tracing::error!(work_order_id = %record.id, error = %e, "failed to persist work order to database");
            return Err(AppError::Internal(
                "work order created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/work-orders — List work orders visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/work-orders",
    responses(
        (status = 200, description = "Work orders in the caller's scope", body = Vec<WorkOrderRecord>),
    ),
    tag = "work_orders"
)]
async fn list_work_orders(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<Vec<WorkOrderRecord>> {
    Json(state.scoped_work_orders(&caller))
}

/// GET /v1/work-orders/:id — Get a single work order.
#[utoipa::path(
    get,
    path = "/v1/work-orders/{id}",
    params(("id" = Uuid, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Work order found", body = WorkOrderRecord),
        (status = 404, description = "Work order not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "work_orders"
)]
async fn get_work_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkOrderRecord>, AppError> {
    state
        .scoped_work_order(&caller, &id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("work order"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_work_order_request_valid() {
        let req = CreateWorkOrderRequest {
            customer_id: Uuid::new_v4(),
            site_id: Uuid::new_v4(),
            title: "Quarterly compressor service".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_work_order_request_empty_title() {
        let req = CreateWorkOrderRequest {
            customer_id: Uuid::new_v4(),
            site_id: Uuid::new_v4(),
            title: "\t".to_string(),
        };
        let err = req.validate().unwrap_err();
        assert!(err.contains("title"), "error should mention title: {err}");
    }
}
