//! API handlers module

pub mod diagnostics;
pub mod health;
pub mod plans;
pub mod reminders;
pub mod reviews;
pub mod sources;

use eduflow_common::errors::AppError;
use validator::ValidationErrors;

/// Map derive-validation failures onto the first offending field
pub(crate) fn invalid_request(errors: ValidationErrors) -> AppError {
    let field = errors.field_errors().keys().next().map(|f| f.to_string());
    AppError::Validation {
        message: errors.to_string(),
        field,
    }
}
