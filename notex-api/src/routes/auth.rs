/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/signup` - Create an account and get tokens
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Exchange a refresh token for an access token
/// - `GET /api/auth/me` - Current user (authenticated)
/// - `POST /api/auth/reset-password` - Redeem an admin-issued reset token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use notex_shared::{
    auth::{jwt, middleware::AuthContext, password, reset_token},
    models::user::{normalize_username, validate_username, CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    pub username: String,

    pub password: String,

    /// Opaque image string, typically a data URL
    pub profile_picture: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Signup and login response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub reset_token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub(crate) fn field_error(field: &str, message: String) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail {
        field: field.to_string(),
        message,
    }])
}

/// Create an account
///
/// The username is trimmed and lowercased before the uniqueness check, so
/// `Alice` and `alice` collide.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Username already taken
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let username = normalize_username(&req.username);
    validate_username(&username).map_err(|e| field_error("username", e))?;
    password::validate_password(&req.password).map_err(|e| field_error("password", e))?;

    if User::find_by_username(&state.db, &username).await?.is_some() {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    // A concurrent signup can still win the race; the unique index turns that into 409
    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.trim().to_string(),
            username,
            password_hash,
            profile_picture: req.profile_picture,
            is_admin: false,
        },
    )
    .await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// Login with username and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown username or wrong password
/// - `403 Forbidden`: Account is banned
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate().map_err(ApiError::from_validation)?;

    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    if user.is_banned {
        tracing::info!(user_id = %user.id, "Login refused: user is banned");
        return Err(ApiError::Forbidden("Your account has been banned".to_string()));
    }

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(SessionResponse {
        user,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;
    Ok(Json(RefreshResponse { access_token }))
}

/// Current user
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse { user }))
}

/// Redeem a reset token for a new password
///
/// # Errors
///
/// - `400 Bad Request`: Token malformed, unknown or expired, or the new
///   password is invalid
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let invalid = || ApiError::BadRequest("Invalid or expired reset token".to_string());

    let token = req.reset_token.trim();
    if !reset_token::validate_reset_token_format(token) {
        return Err(invalid());
    }

    password::validate_password(&req.new_password).map_err(|e| field_error("new_password", e))?;

    let user = User::find_by_reset_token(&state.db, &reset_token::hash_reset_token(token))
        .await?
        .ok_or_else(invalid)?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::reset_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password reset via token");

    Ok(MessageResponse::new("Password has been reset"))
}
