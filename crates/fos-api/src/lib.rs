//! # fos-api — Axum API Services for the FieldOps Stack
//!
//! The FieldOps Stack is the dispatch and closeout layer for field-service
//! operations. It manages customers and their sites, work orders and the
//! work packages and tasks beneath them, technician visits, and the
//! evidence-backed closeout gate that decides when a visit may close.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                       | Domain              |
//! |-------------------------|------------------------------|---------------------|
//! | `/v1/customers/*`       | [`routes::customers`]        | Customer directory  |
//! | `/v1/sites/*`           | [`routes::sites`]            | Service locations   |
//! | `/v1/users/*`           | [`routes::users`]            | Org membership      |
//! | `/v1/work-orders/*`     | [`routes::work_orders`]      | Work orders         |
//! | `/v1/work-packages/*`   | [`routes::work_packages`]    | Work packages       |
//! | `/v1/tasks/*`           | [`routes::tasks`]            | Tasks and evidence  |
//! | `/v1/visits/*`          | [`routes::visits`]           | Visits and closeout |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated OpenAPI spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod scope;
pub mod state;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Check if metrics are enabled via the `FOS_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything other than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("FOS_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`), `/metrics`, and `/openapi.json` are mounted
/// outside the auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());
    let metrics_on = metrics_enabled();

    // Authenticated API routes.
    //
    // Body size limit: 2 MiB. This prevents OOM from oversized request bodies.
    //
    // Middleware execution order (outermost → innermost):
    //   TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
    //
    // Auth runs BEFORE rate limiting so unauthenticated requests are rejected
    // without consuming rate limit quota, and so the limiter can key buckets
    // by the authenticated organization.
    let api = Router::new()
        .merge(routes::customers::router())
        .merge(routes::sites::router())
        .merge(routes::users::router())
        .merge(routes::work_orders::router())
        .merge(routes::work_packages::router())
        .merge(routes::tasks::router())
        .merge(routes::visits::router());

    let mut api = api
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware));

    // Only register the metrics middleware when metrics are enabled.
    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(axum::Extension(metrics.clone()));
    }

    let api = api
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(limiter))
        .with_state(state.clone());

    // Unauthenticated probes and machine-readable surfaces.
    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(openapi::router());

    // Mount /metrics when metrics are enabled (unauthenticated, like health probes).
    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(axum::Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull model),
/// then gathers and encodes all metrics in Prometheus text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // -- Update domain gauges from AppState --

    metrics.users_total().set(state.users.len() as f64);
    metrics.customers_total().set(state.customers.len() as f64);
    metrics.sites_total().set(state.sites.len() as f64);
    metrics
        .evidence_records_total()
        .set(state.evidence.len() as f64);

    // Work orders by status.
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for wo in state.work_orders.list() {
        *by_status.entry(wo.status.as_str()).or_default() += 1;
    }
    metrics.work_orders_total().reset();
    for (status, count) in &by_status {
        metrics
            .work_orders_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // Tasks by status.
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for task in state.tasks.list() {
        *by_status.entry(task.status.as_str()).or_default() += 1;
    }
    metrics.tasks_total().reset();
    for (status, count) in &by_status {
        metrics
            .tasks_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // Visits by status.
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for visit in state.visits.list() {
        *by_status.entry(visit.status.as_str()).or_default() += 1;
    }
    metrics.visits_total().reset();
    for (status, count) in &by_status {
        metrics
            .visits_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // -- Gather and encode --
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible (read lock acquirable).
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible.
    let _ = state.work_orders.len();
    let _ = state.tasks.len();
    let _ = state.visits.len();

    // Verify database connection (when configured).
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
