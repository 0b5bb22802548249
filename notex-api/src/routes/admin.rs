/// Administrator endpoints
///
/// All routes sit behind the JWT layer and the admin-only layer.
///
/// # Endpoints
///
/// - `GET /api/admin/users` - Every user with their note count
/// - `POST /api/admin/ban` - `{ "user_id", "ban" }` ban or unban a user
/// - `POST /api/admin/users/:id/reset-token` - Issue a one-hour reset token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::MessageResponse,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use notex_shared::{
    auth::{middleware::AuthContext, reset_token::generate_reset_token},
    models::user::{User, UserWithNoteCount},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct AdminUsersResponse {
    pub users: Vec<UserWithNoteCount>,
}

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub user_id: Uuid,
    pub ban: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    /// Shown once; only its hash is stored
    pub reset_token: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<AdminUsersResponse>> {
    let users = User::list_with_note_counts(&state.db).await?;
    Ok(Json(AdminUsersResponse { users }))
}

/// # Errors
///
/// - `400 Bad Request`: target is an admin
/// - `404 Not Found`: unknown user
/// - `409 Conflict`: target changed while the ban was applied
pub async fn ban_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BanRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let target = User::find_by_id(&state.db, req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    target.ensure_bannable().map_err(ApiError::BadRequest)?;

    if !User::set_banned(&state.db, target.id, req.ban).await? {
        // Target changed between the read and the write
        let current = User::find_by_id(&state.db, target.id).await?;
        return Err(ban_not_applied(current.as_ref()));
    }

    tracing::info!(
        admin_id = %auth.user_id,
        target_id = %target.id,
        banned = req.ban,
        "Ban state changed"
    );

    let message = if req.ban {
        "User banned successfully"
    } else {
        "User unbanned successfully"
    };
    Ok(MessageResponse::new(message))
}

/// Error for a guarded ban update that matched no row
fn ban_not_applied(current: Option<&User>) -> ApiError {
    match current {
        None => ApiError::NotFound("User not found".to_string()),
        Some(user) => match user.ensure_bannable() {
            Err(msg) => ApiError::BadRequest(msg),
            Ok(()) => ApiError::Conflict("User changed, try again".to_string()),
        },
    }
}

pub async fn issue_reset_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ResetTokenResponse>> {
    let issued = generate_reset_token();

    if !User::set_reset_token(&state.db, id, &issued.hash, issued.expires_at).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(admin_id = %auth.user_id, target_id = %id, "Reset token issued");

    Ok(Json(ResetTokenResponse {
        reset_token: issued.token,
        expires_at: issued.expires_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Target".to_string(),
            username: "target".to_string(),
            password_hash: String::new(),
            profile_picture: None,
            is_admin,
            is_banned: false,
            default_note_name: "Untitled Note".to_string(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ban_not_applied_to_deleted_user_is_404() {
        assert_eq!(ban_not_applied(None).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_ban_not_applied_to_promoted_user_is_400() {
        let err = ban_not_applied(Some(&user(true)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Cannot ban admin users");
    }

    #[test]
    fn test_ban_not_applied_otherwise_is_conflict() {
        assert_eq!(
            ban_not_applied(Some(&user(false))).status_code(),
            StatusCode::CONFLICT
        );
    }
}
