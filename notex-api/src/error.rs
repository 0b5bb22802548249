/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`; the error renders as
/// `{ "error": "<message>" }` (plus `details` for field validation) with the
/// matching status code.
///
/// # Example
///
/// ```
/// use notex_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(title: Option<String>) -> ApiResult<Json<Value>> {
///     let title = title.ok_or_else(|| ApiError::BadRequest("Title is required".to_string()))?;
///     Ok(Json(json!({ "title": title })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notex_shared::auth::{
    authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
};
use notex_shared::models::shared_note::ShareTransitionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),

    /// 401
    Unauthorized(String),

    /// 403
    Forbidden(String),

    /// 404
    NotFound(String),

    /// 409 - duplicate username, settled share, duplicate pending share
    Conflict(String),

    /// 400 with per-field details
    ValidationError(Vec<ValidationErrorDetail>),

    /// 500 - the message is logged, never returned
    InternalError(String),

    /// 503
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Flattens `validator` errors into field details
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg) => f.write_str(msg),
            ApiError::ValidationError(details) => match details.first() {
                Some(first) => f.write_str(&first.message),
                None => f.write_str("Validation failed"),
            },
            ApiError::InternalError(_) => f.write_str("Internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ApiError::InternalError(msg) = &self {
            tracing::error!(error = %msg, "Internal error");
        }

        let error = self.to_string();
        let details = match self {
            ApiError::ValidationError(details) => Some(details),
            _ => None,
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.constraint() {
                Some("users_username_key") => {
                    ApiError::Conflict("Username already taken".to_string())
                }
                Some("shared_notes_one_pending") => {
                    ApiError::Conflict("Note is already shared with this user".to_string())
                }
                Some(constraint) if db_err.is_unique_violation() => {
                    ApiError::Conflict(format!("Constraint violation: {}", constraint))
                }
                _ => ApiError::InternalError(format!("Database error: {}", db_err)),
            },
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) | AuthError::UnknownUser => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::Banned => ApiError::Forbidden(err.to_string()),
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAdmin | AuthzError::NotAuthorized => ApiError::Forbidden(err.to_string()),
            AuthzError::NoteNotFound => ApiError::NotFound(err.to_string()),
            AuthzError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<ShareTransitionError> for ApiError {
    fn from(err: ShareTransitionError) -> Self {
        match err {
            ShareTransitionError::NotFound => ApiError::NotFound(err.to_string()),
            ShareTransitionError::NotReceiver => ApiError::Forbidden(err.to_string()),
            ShareTransitionError::NotPending(_) => ApiError::Conflict(err.to_string()),
            ShareTransitionError::NoteGone => ApiError::NotFound(err.to_string()),
            ShareTransitionError::Database(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}
