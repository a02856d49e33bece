/// API route handlers, by resource
///
/// - `health`: health check
/// - `auth`: accounts, sessions and passwords
/// - `projects`: projects and memberships
/// - `tasks`: tasks and subtasks
/// - `notes`: project notes

pub mod auth;
pub mod health;
pub mod notes;
pub mod projects;
pub mod tasks;

use crate::error::ApiError;

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
