//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec.
//! Serves at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "FieldOps Stack API",
        version = "0.3.7",
        description = "Field-service operations API: customers, sites, work orders, work packages, tasks, evidence, visits, and the visit closeout gate.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Customers
        crate::routes::customers::create_customer,
        crate::routes::customers::list_customers,
        crate::routes::customers::get_customer,
        // Sites
        crate::routes::sites::create_site,
        crate::routes::sites::list_sites,
        crate::routes::sites::get_site,
        // Users
        crate::routes::users::create_user,
        crate::routes::users::list_users,
        // Work orders
        crate::routes::work_orders::create_work_order,
        crate::routes::work_orders::list_work_orders,
        crate::routes::work_orders::get_work_order,
        // Work packages
        crate::routes::work_packages::create_work_package,
        crate::routes::work_packages::list_work_packages,
        crate::routes::work_packages::get_work_package,
        // Tasks and evidence
        crate::routes::tasks::create_task,
        crate::routes::tasks::list_tasks,
        crate::routes::tasks::get_task,
        crate::routes::tasks::update_task_status,
        crate::routes::tasks::create_evidence,
        crate::routes::tasks::list_evidence,
        // Visits and closeout
        crate::routes::visits::create_visit,
        crate::routes::visits::list_visits,
        crate::routes::visits::get_visit,
        crate::routes::visits::closeout_gate,
        crate::routes::visits::close_visit,
    ),
    components(schemas(
        // State record types
        crate::state::UserRecord,
        crate::state::CustomerRecord,
        crate::state::SiteRecord,
        crate::state::WorkOrderRecord,
        crate::state::WorkPackageRecord,
        crate::state::TaskRecord,
        crate::state::EvidenceRecord,
        crate::state::VisitRecord,
        // Shared enums
        fos_core::Role,
        fos_core::TaskStatus,
        fos_core::VisitStatus,
        fos_core::WorkOrderStatus,
        // Closeout gate types
        fos_gate::GateResult,
        fos_gate::GateBlocker,
        fos_gate::BlockerKind,
        fos_gate::GateSummary,
        fos_gate::CriticalTally,
        fos_gate::EvidenceTally,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Customer DTOs
        crate::routes::customers::CreateCustomerRequest,
        // Site DTOs
        crate::routes::sites::CreateSiteRequest,
        // User DTOs
        crate::routes::users::CreateUserRequest,
        // Work order DTOs
        crate::routes::work_orders::CreateWorkOrderRequest,
        // Work package DTOs
        crate::routes::work_packages::CreateWorkPackageRequest,
        // Task DTOs
        crate::routes::tasks::CreateTaskRequest,
        crate::routes::tasks::UpdateTaskStatusRequest,
        crate::routes::tasks::CreateEvidenceRequest,
        // Visit DTOs
        crate::routes::visits::CreateVisitRequest,
    )),
    tags(
        (name = "customers", description = "Customer directory"),
        (name = "sites", description = "Customer service locations"),
        (name = "users", description = "Organization membership and roles"),
        (name = "work_orders", description = "Work order lifecycle"),
        (name = "work_packages", description = "Work packages grouping tasks under a work order"),
        (name = "tasks", description = "Tasks and completion evidence"),
        (name = "visits", description = "Scheduled visits and the closeout gate"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
