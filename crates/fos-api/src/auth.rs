//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control (RBAC).
//!
//! ## Token Format
//!
//! Bearer tokens encode the caller's role, tenancy, and user identity,
//! plus a shared secret verified in constant time:
//!
//! ```text
//! Bearer {role}:{org_id}:{user_id}:{secret}   (production)
//! Bearer {role}:{org_id}:{user_id}            (development)
//! ```
//!
//! Credential verification happens upstream; this service trusts the
//! gateway-issued token and only checks the shared secret. When no secret
//! is configured (development mode) the identity-only form is accepted.
//! Every record in the system is organization-scoped, so there is no
//! meaningful anonymous identity: development mode skips the secret, never
//! the identity.
//!
//! ## Caller
//!
//! Every authenticated request gets a [`Principal`] injected into the
//! request extensions. Handlers extract it via the [`Caller`] wrapper's
//! `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use fos_core::{OrgId, Principal, Role, UserId};

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Caller ──────────────────────────────────────────────────────────────────

/// The authenticated principal, as an extractor.
///
/// Wraps [`Principal`] so route handlers can take it as an argument.
/// Dereferences to the principal; returns 401 if no identity is present
/// (middleware didn't run or failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Principal);

impl std::ops::Deref for Caller {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.0
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &Principal, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// Prevents timing side-channels that could reveal secret length or prefix.
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Dummy comparison to keep timing constant regardless of length match.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token into a [`Principal`].
///
/// With a configured secret the format is `{role}:{org_id}:{user_id}:{secret}`.
/// Without one (development mode) the secret part is optional and ignored.
/// The role string goes through [`Role::from_str`], so anything outside the
/// recognized enumeration is rejected here, before a principal exists.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<Principal, String> {
    let parts: Vec<&str> = provided.splitn(4, ':').collect();

    match (parts.len(), expected_secret) {
        (4, Some(expected)) => {
            if !constant_time_token_eq(parts[3], expected) {
                return Err("invalid bearer token".into());
            }
            principal_from_parts(parts[0], parts[1], parts[2])
        }
        // Development mode: identity only. A trailing secret is tolerated
        // so production client configs keep working, but nothing checks it.
        (3, None) | (4, None) => principal_from_parts(parts[0], parts[1], parts[2]),
        (_, Some(_)) => {
            Err("invalid token format: expected {role}:{org_id}:{user_id}:{secret}".into())
        }
        (_, None) => Err("invalid token format: expected {role}:{org_id}:{user_id}".into()),
    }
}

fn principal_from_parts(role: &str, org: &str, user: &str) -> Result<Principal, String> {
    let role: Role = role.parse().map_err(|e| format!("{e}"))?;
    let org_id = org
        .parse::<uuid::Uuid>()
        .map(OrgId::from_uuid)
        .map_err(|e| format!("invalid org_id: {e}"))?;
    let user_id = user
        .parse::<uuid::Uuid>()
        .map(UserId::from_uuid)
        .map_err(|e| format!("invalid user_id: {e}"))?;
    Ok(Principal::new(org_id, user_id, role))
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Extract and validate the Bearer token from the Authorization header.
///
/// Parses the token into a [`Principal`] (role + org + user binding) and
/// injects it into request extensions for downstream handlers.
///
/// When `AuthConfig.token` is `None`, the secret is not verified but the
/// identity part of the token is still required: a request without a
/// parseable identity is rejected in both modes.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) if header_value.starts_with("Bearer ") => {
            let provided = &header_value[7..];
            match parse_bearer_token(provided, config.token.as_deref()) {
                Ok(principal) => {
                    request.extensions_mut().insert(principal);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    unauthorized_response(&msg)
                }
            }
        }
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const ORG: &str = "11111111-1111-1111-1111-111111111111";
    const USER: &str = "22222222-2222-2222-2222-222222222222";

    /// Build a minimal router with the auth middleware, a simple handler,
    /// and an identity echo for extraction round-trips.
    fn test_app(token: Option<String>) -> Router {
        let auth_config = AuthConfig { token };
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .route(
                "/whoami",
                get(|caller: Caller| async move {
                    format!("{}:{}", caller.role.as_str(), caller.org_id)
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    fn bearer(parts: &str) -> String {
        format!("Bearer {parts}")
    }

    // ── Middleware tests ──────────────────────────────────────────

    #[tokio::test]
    async fn valid_bearer_token_accepted() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", bearer(&format!("tech:{ORG}:{USER}:my-secret")))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn missing_authorization_header_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"]
            .as_str()
            .unwrap()
            .contains("missing"));
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", bearer(&format!("tech:{ORG}:{USER}:wrong")))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"]
            .as_str()
            .unwrap()
            .contains("invalid"));
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(err["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn dev_mode_accepts_identity_only_token() {
        let app = test_app(None);

        let request = Request::builder()
            .uri("/whoami")
            .header("Authorization", bearer(&format!("dispatcher:{ORG}:{USER}")))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text, format!("DISPATCHER:{ORG}"));
    }

    #[tokio::test]
    async fn dev_mode_tolerates_production_format_token() {
        let app = test_app(None);

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", bearer(&format!("admin:{ORG}:{USER}:whatever")))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dev_mode_still_requires_identity() {
        let app = test_app(None);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn caller_extraction_round_trips_the_token_identity() {
        let app = test_app(Some("s3cr3t".to_string()));

        let request = Request::builder()
            .uri("/whoami")
            .header("Authorization", bearer(&format!("TECH:{ORG}:{USER}:s3cr3t")))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text, format!("TECH:{ORG}"));
    }

    // ── constant_time_token_eq tests ──────────────────────────────

    #[test]
    fn constant_time_eq_identical_tokens() {
        assert!(constant_time_token_eq(
            "secret-token-123",
            "secret-token-123"
        ));
    }

    #[test]
    fn constant_time_eq_rejects_wrong_token() {
        assert!(!constant_time_token_eq("wrong-token", "secret-token-123"));
    }

    #[test]
    fn constant_time_eq_rejects_prefix() {
        assert!(!constant_time_token_eq("secret", "secret-token-123"));
    }

    #[test]
    fn constant_time_eq_rejects_empty() {
        assert!(!constant_time_token_eq("", "secret-token-123"));
    }

    // ── require_role tests ───────────────────────────────────────

    fn principal(role: Role) -> Principal {
        Principal::new(OrgId::new(), UserId::new(), role)
    }

    #[test]
    fn require_role_passes_for_sufficient_role() {
        assert!(require_role(&principal(Role::Admin), Role::Dispatcher).is_ok());
        assert!(require_role(&principal(Role::Dispatcher), Role::Dispatcher).is_ok());
    }

    #[test]
    fn require_role_fails_for_insufficient_role() {
        let err = require_role(&principal(Role::Tech), Role::Dispatcher).unwrap_err();
        match err {
            AppError::Forbidden(msg) => {
                assert!(msg.contains("DISPATCHER"));
                assert!(msg.contains("TECH"));
            }
            other => panic!("expected Forbidden, got: {other:?}"),
        }
    }

    // ── parse_bearer_token tests ─────────────────────────────────

    #[test]
    fn parse_bearer_token_full_format() {
        let token = format!("tech:{ORG}:{USER}:my-secret");
        let principal = parse_bearer_token(&token, Some("my-secret")).unwrap();
        assert_eq!(principal.role, Role::Tech);
        assert_eq!(principal.org_id.to_string(), ORG);
        assert_eq!(principal.user_id.to_string(), USER);
    }

    #[test]
    fn parse_bearer_token_role_is_case_insensitive() {
        let token = format!("ADMIN:{ORG}:{USER}:my-secret");
        let principal = parse_bearer_token(&token, Some("my-secret")).unwrap();
        assert_eq!(principal.role, Role::Admin);
    }

    #[test]
    fn parse_bearer_token_wrong_secret() {
        let token = format!("admin:{ORG}:{USER}:wrong");
        let result = parse_bearer_token(&token, Some("my-secret"));
        assert!(result.is_err());
    }

    #[test]
    fn parse_bearer_token_unknown_role() {
        let token = format!("superadmin:{ORG}:{USER}:my-secret");
        let result = parse_bearer_token(&token, Some("my-secret"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("unrecognized role"));
    }

    #[test]
    fn parse_bearer_token_invalid_org_id() {
        let token = format!("tech:not-a-uuid:{USER}:my-secret");
        let result = parse_bearer_token(&token, Some("my-secret"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("invalid org_id"));
    }

    #[test]
    fn parse_bearer_token_invalid_user_id() {
        let token = format!("tech:{ORG}:not-a-uuid:my-secret");
        let result = parse_bearer_token(&token, Some("my-secret"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("invalid user_id"));
    }

    #[test]
    fn parse_bearer_token_identity_only_rejected_when_secret_configured() {
        let token = format!("tech:{ORG}:{USER}");
        let result = parse_bearer_token(&token, Some("my-secret"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("invalid token format"));
    }

    #[test]
    fn parse_bearer_token_bare_secret_rejected() {
        // No identity parts at all. There is no legacy single-part form.
        let result = parse_bearer_token("my-secret", Some("my-secret"));
        assert!(result.is_err());
    }

    #[test]
    fn parse_bearer_token_extra_colons_fold_into_secret() {
        let token = format!("tech:{ORG}:{USER}:se:cr:et");
        let principal = parse_bearer_token(&token, Some("se:cr:et")).unwrap();
        assert_eq!(principal.role, Role::Tech);
    }

    #[test]
    fn parse_bearer_token_dev_mode_rejects_unknown_role_too() {
        let token = format!("root:{ORG}:{USER}");
        let result = parse_bearer_token(&token, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("unrecognized role"));
    }

    // ── Middleware with malformed identities ──────────────────────

    #[tokio::test]
    async fn middleware_unknown_role_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header(
                "Authorization",
                bearer(&format!("superadmin:{ORG}:{USER}:my-secret")),
            )
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn middleware_invalid_uuid_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header(
                "Authorization",
                bearer(&format!("tech:not-a-uuid:{USER}:my-secret")),
            )
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            token: Some("super-secret".to_string()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
