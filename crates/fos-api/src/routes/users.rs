//! # Users — Organization Member Directory
//!
//! ## Endpoints
//!
//! - `POST /v1/users` — create user (admin only)
//! - `GET /v1/users` — list organization members (dispatcher or admin)
//!
//! Users are created directly by an admin; there is no invitation flow.
//! The role in the request body uses the wire form (`ADMIN`, `DISPATCHER`,
//! `TECH`), enforced by the `Role` deserializer.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
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
use crate::state::{AppState, UserRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new organization member.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Display name shown in listings.
    pub display_name: String,
    /// Email address.
    pub email: String,
    /// Member role: `ADMIN`, `DISPATCHER`, or `TECH`.
    pub role: Role,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("display_name must not be empty".to_string());
        }
        if !self.email.contains('@') {
            return Err("email must be a valid email address".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/users", get(list_users).post(create_user))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/users — Create a new organization member.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserRecord),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn create_user(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<UserRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let record = UserRecord {
        id: Uuid::new_v4(),
        org_id: *caller.org_id.as_uuid(),
        display_name: req.display_name,
        email: req.email,
        role: req.role,
        created_at: Utc::now(),
    };

    state.users.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::insert(pool, &record).await {
            tracing::error!(user_id = %record.id, error = %e, "failed to persist user to database");
            return Err(AppError::Internal(
                "user created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/users — List the caller's organization members.
#[utoipa::path(
    get,
    path = "/v1/users",
    responses(
        (status = 200, description = "Organization members", body = Vec<UserRecord>),
        (status = 403, description = "Technicians cannot list the directory", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    require_role(&caller, Role::Dispatcher)?;
    Ok(Json(state.org_users(&caller)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_request_valid() {
        let req = CreateUserRequest {
            display_name: "Sam Ortiz".to_string(),
            email: "sam@fieldops.example".to_string(),
            role: Role::Tech,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_user_request_empty_display_name() {
        let req = CreateUserRequest {
            display_name: " ".to_string(),
            email: "sam@fieldops.example".to_string(),
            role: Role::Tech,
        };
        let err = req.validate().unwrap_err();
        assert!(
            err.contains("display_name"),
            "error should mention display_name: {err}"
        );
    }

    #[test]
    fn create_user_request_malformed_email() {
        let req = CreateUserRequest {
            display_name: "Sam Ortiz".to_string(),
            email: "sam-at-fieldops".to_string(),
            role: Role::Dispatcher,
        };
        let err = req.validate().unwrap_err();
        assert!(err.contains("email"), "error should mention email: {err}");
    }

    #[test]
    fn role_wire_form_deserializes() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"display_name":"Sam","email":"sam@x.example","role":"DISPATCHER"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Dispatcher);
    }

    #[test]
    fn unknown_role_wire_form_is_rejected() {
        let result: Result<CreateUserRequest, _> = serde_json::from_str(
            r#"{"display_name":"Sam","email":"sam@x.example","role":"SUPERVISOR"}"#,
        );
        assert!(result.is_err());
    }
}
