//! # Error Hierarchy
//!
//! Structured error types for the FieldOps Stack, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Each variant carries the rejected input so that operators can diagnose
//! bad tokens or corrupted rows without guesswork.

use thiserror::Error;

/// Validation errors for domain enumerations parsed from strings.
///
/// Roles and statuses exist as strings only at trust boundaries: bearer
/// tokens and stored rows. Construction past those boundaries works on
/// closed enums, so these errors mark exactly the points where untrusted
/// input enters the system.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Role string is not one of the three recognized values.
    #[error("unrecognized role: \"{0}\" (expected ADMIN, DISPATCHER, or TECH)")]
    InvalidRole(String),

    /// Task status string is outside the task lifecycle enumeration.
    #[error("unrecognized task status: \"{0}\" (expected TODO, IN_PROGRESS, DONE, BLOCKED, or SKIPPED)")]
    InvalidTaskStatus(String),

    /// Visit status string is outside the visit lifecycle enumeration.
    #[error("unrecognized visit status: \"{0}\" (expected SCHEDULED, EN_ROUTE, ON_SITE, COMPLETED, or CANCELLED)")]
    InvalidVisitStatus(String),

    /// Work order status string is outside the work order lifecycle enumeration.
    #[error("unrecognized work order status: \"{0}\" (expected OPEN, IN_PROGRESS, COMPLETED, or CANCELLED)")]
    InvalidWorkOrderStatus(String),
}
