//! # Body Extraction & Validation
//!
//! The [`Validate`] trait for request DTOs, plus helpers that turn axum's
//! JSON rejections into structured API errors instead of axum's plain-text
//! defaults.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business-rule validation for request bodies, beyond what serde checks.
///
/// Implementations return a message describing the first violated rule.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping deserialization failures to
/// [`AppError::BadRequest`] so they render as the standard error body.
///
/// Handlers take the fallible `Json` and pass it through:
/// ```ignore
/// async fn create_task(
///     body: Result<Json<CreateTaskRequest>, JsonRejection>,
/// ) -> Result<(StatusCode, Json<TaskRecord>), AppError> {
///     let req = extract_validated_json(body)?;
///     // ...
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// [`extract_json`] followed by [`Validate::validate`].
///
/// Deserialization failures become `BadRequest`, rule violations become
/// `Validation`; both render as 422 with distinct codes.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
