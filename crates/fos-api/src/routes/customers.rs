//! # Customers — Accounts the Organization Serves
//!
//! ## Endpoints
//!
//! - `POST /v1/customers` — create customer (dispatcher or admin)
//! - `GET /v1/customers` — list customers in scope
//! - `GET /v1/customers/:id` — get customer

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
use crate::state::{AppState, CustomerRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new customer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    /// Customer display name.
    pub name: String,
    /// Optional billing/contact email.
    pub contact_email: Option<String>,
}

impl Validate for CreateCustomerRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if let Some(ref email) = self.contact_email {
            if !email.contains('@') {
                return Err("contact_email must be a valid email address".to_string());
            }
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the customers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/customers", get(list_customers).post(create_customer))
        .route("/v1/customers/:id", get(get_customer))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/customers — Create a new customer.
#[utoipa::path(
    post,
    path = "/v1/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = CustomerRecord),
        (status = 403, description = "Caller role cannot create customers", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "customers"
)]
async fn create_customer(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<CustomerRecord>), AppError> {
    require_role(&caller, Role::Dispatcher)?;
    let req = extract_validated_json(body)?;

    let record = CustomerRecord {
        id: Uuid::new_v4(),
        org_id: *caller.org_id.as_uuid(),
        name: req.name,
        contact_email: req.contact_email,
        created_at: Utc::now(),
    };

    state.customers.insert(record.id, record.clone());

    // Write-through: the database must see every record the store accepted.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::customers::insert(pool, &record).await {
            tracing::error!(customer_id = %record.id, error = %e, "failed to persist customer to database");
            return Err(AppError::Internal(
                "customer created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/customers — List customers visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/customers",
    responses(
        (status = 200, description = "Customers in the caller's scope", body = Vec<CustomerRecord>),
    ),
    tag = "customers"
)]
async fn list_customers(State(state): State<AppState>, caller: Caller) -> Json<Vec<CustomerRecord>> {
    Json(state.scoped_customers(&caller))
}

/// GET /v1/customers/:id — Get a single customer.
#[utoipa::path(
    get,
    path = "/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer found", body = CustomerRecord),
        (status = 404, description = "Customer not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "customers"
)]
async fn get_customer(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerRecord>, AppError> {
    state
        .scoped_customer(&caller, &id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("customer"))
}
