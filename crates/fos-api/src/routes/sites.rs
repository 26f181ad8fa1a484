//! # Sites — Service Locations
//!
//! ## Endpoints
//!
//! - `POST /v1/sites` — create site (dispatcher or admin)
//! - `GET /v1/sites` — list sites in scope
//! - `GET /v1/sites/:id` — get site

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
use crate::state::{AppState, SiteRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new site.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSiteRequest {
    /// Customer this site belongs to.
    pub customer_id: Uuid,
    /// Short human label, e.g. "North Warehouse".
    pub label: String,
    /// Street address.
    pub address: String,
}

impl Validate for CreateSiteRequest {
    fn validate(&self) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("label must not be empty".to_string());
        }
        if self.address.trim().is_empty() {
            return Err("address must not be empty".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the sites router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sites", get(list_sites).post(create_site))
        .route("/v1/sites/:id", get(get_site))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/sites — Create a new site under a customer.
///
/// The customer reference is resolved through the caller's scope, so a
/// customer in another organization is a 404, not a foreign-key error.
#[utoipa::path(
    post,
    path = "/v1/sites",
    request_body = CreateSiteRequest,
    responses(
        (status = 201, description = "Site created", body = SiteRecord),
        (status = 403, description = "Caller role cannot create sites", body = crate::error::ErrorBody),
        (status = 404, description = "Customer not found or not in scope", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "sites"
)]
async fn create_site(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<SiteRecord>), AppError> {
    require_role(&caller, Role::Dispatcher)?;
    let req = extract_validated_json(body)?;

    let customer = state
        .scoped_customer(&caller, &req.customer_id)
        .ok_or_else(|| AppError::not_found("customer"))?;

    let record = SiteRecord {
        id: Uuid::new_v4(),
        org_id: customer.org_id,
        customer_id: customer.id,
        label: req.label,
        address: req.address,
        created_at: Utc::now(),
    };

    state.sites.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::sites::insert(pool, &record).await {
            tracing::error!(site_id = %record.id, error = %e, "failed to persist site to database");
            return Err(AppError::Internal(
                "site created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/sites — List sites visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/sites",
    responses(
        (status = 200, description = "Sites in the caller's scope", body = Vec<SiteRecord>),
    ),
    tag = "sites"
)]
async fn list_sites(State(state): State<AppState>, caller: Caller) -> Json<Vec<SiteRecord>> {
    Json(state.scoped_sites(&caller))
}

/// GET /v1/sites/:id — Get a single site.
#[utoipa::path(
    get,
    path = "/v1/sites/{id}",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site found", body = SiteRecord),
        (status = 404, description = "Site not found or not in scope", body = crate::error::ErrorBody),
    ),
    tag = "sites"
)]
async fn get_site(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SiteRecord>, AppError> {
    state
        .scoped_site(&caller, &id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("site"))
}
