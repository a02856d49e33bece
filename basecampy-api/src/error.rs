/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Domain errors from the shared crate
/// convert into [`ApiError`] with `?`, and the error renders as:
///
/// ```json
/// {
///   "status_code": 403,
///   "success": false,
///   "error": "forbidden",
///   "message": "You are not a member of this project",
///   "errors": []
/// }
/// ```
///
/// # Example
///
/// ```
/// use basecampy_api::error::{ApiError, ApiResult};
///
/// fn find(found: bool) -> ApiResult<&'static str> {
///     if !found {
///         return Err(ApiError::NotFound("Task not found".to_string()));
///     }
///     Ok("task")
/// }
///
/// assert!(find(false).is_err());
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use basecampy_shared::auth::authorization::AuthzError;
use basecampy_shared::auth::jwt::JwtError;
use basecampy_shared::auth::middleware::AuthError;
use basecampy_shared::auth::password::PasswordError;
use basecampy_shared::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Unprocessable entity (422) with per-field errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// One failed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status_code: u16,

    /// Always false
    pub success: bool,

    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level errors, empty unless validation failed
    pub errors: Vec<ValidationErrorDetail>,
}

impl ApiError {
    /// HTTP status this error renders with
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    /// Error from an insert whose foreign keys name caller-supplied rows
    ///
    /// A foreign key violation here means the referenced row vanished
    /// between the handler's checks and the insert, so it renders as 404.
    /// Everywhere else the same violation is a server fault.
    pub fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::NotFound("Referenced resource not found".to_string())
            }
            _ => err.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, errors) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, Vec::new()),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, Vec::new()),
            ApiError::Forbidden(msg) => ("forbidden", msg, Vec::new()),
            ApiError::NotFound(msg) => ("not_found", msg, Vec::new()),
            ApiError::Conflict(msg) => ("conflict", msg, Vec::new()),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Received data is not valid".to_string(),
                errors,
            ),
            ApiError::InternalError(msg) => {
                // Details stay in the log
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    Vec::new(),
                )
            }
        };

        let body = Json(ErrorResponse {
            status_code: status.as_u16(),
            success: false,
            error: error_code.to_string(),
            message,
            errors,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return match db_err.constraint() {
                        Some("users_email_key") | Some("users_username_key") => {
                            ApiError::Conflict("User with email or username already exists".to_string())
                        }
                        Some("projects_name_key") => {
                            ApiError::Conflict("A project with this name already exists".to_string())
                        }
                        Some(constraint) => {
                            ApiError::Conflict(format!("Constraint violation: {}", constraint))
                        }
                        None => ApiError::Conflict("Resource already exists".to_string()),
                    };
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Unauthorized request".to_string()),
            AuthError::InvalidToken(JwtError::Expired) => {
                ApiError::Unauthorized("Access token expired".to_string())
            }
            AuthError::InvalidToken(_) | AuthError::UnknownUser => {
                ApiError::Unauthorized("Invalid access token".to_string())
            }
            AuthError::DatabaseError(err) => err.into(),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) | AuthzError::RoleNotAllowed { .. } => {
                ApiError::Forbidden(err.to_string())
            }
            AuthzError::DatabaseError(err) => err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(format!("Token signing failed: {}", msg)),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert storage errors to API errors
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => ApiError::BadRequest(format!("Invalid file name: {}", name)),
            StorageError::Io(e) => ApiError::InternalError(format!("Storage error: {}", e)),
        }
    }
}

/// Convert validator errors into a field-level 422
impl From<validator::ValidationErrors> for ApiError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                let field = field.to_string();
                errors.iter().map(move |error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    ValidationErrorDetail::new(field.clone(), message)
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}
