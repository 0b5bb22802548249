/// Account self-service
///
/// # Endpoints
///
/// - `PUT /api/user/settings` - Update own profile, defaults or password
/// - `DELETE /api/user` - Delete own account, notes and shares

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::{field_error, MessageResponse, UserResponse},
};
use axum::{extract::State, Extension, Json};
use notex_shared::{
    auth::{
        middleware::AuthContext,
        password::{hash_password, validate_password},
    },
    models::{
        note::MAX_TITLE_LENGTH,
        user::{normalize_username, validate_username, UpdateUser, User},
    },
};
use serde::{Deserialize, Deserializer};

/// Partial settings update
///
/// `profile_picture: null` removes the picture; omitting it leaves it as is.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub profile_picture: Option<Option<String>>,
    pub default_note_name: Option<String>,
    pub new_password: Option<String>,
}

/// Distinguishes an explicit `null` from a missing field
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Validates and normalizes a settings request into a column update
fn plan_settings(req: SettingsRequest) -> ApiResult<UpdateUser> {
    let name = match req.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() || name.chars().count() > 100 {
                return Err(field_error(
                    "name",
                    "Name must be between 1 and 100 characters".to_string(),
                ));
            }
            Some(name)
        }
        None => None,
    };

    let username = match req.username {
        Some(username) => {
            let username = normalize_username(&username);
            validate_username(&username).map_err(|e| field_error("username", e))?;
            Some(username)
        }
        None => None,
    };

    let default_note_name = match req.default_note_name {
        Some(title) => {
            let title = title.trim().to_string();
            if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
                return Err(field_error(
                    "default_note_name",
                    format!("Default note name must be between 1 and {} characters", MAX_TITLE_LENGTH),
                ));
            }
            Some(title)
        }
        None => None,
    };

    let password_hash = match req.new_password {
        Some(password) => {
            validate_password(&password).map_err(|e| field_error("new_password", e))?;
            Some(hash_password(&password)?)
        }
        None => None,
    };

    Ok(UpdateUser {
        name,
        username,
        profile_picture: req.profile_picture,
        default_note_name,
        password_hash,
    })
}

/// # Errors
///
/// - `400 Bad Request`: invalid field
/// - `409 Conflict`: username taken by another user (case-insensitive)
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SettingsRequest>,
) -> ApiResult<Json<UserResponse>> {
    let update = plan_settings(req)?;

    if let Some(username) = &update.username {
        if User::username_taken_by_other(&state.db, username, auth.user_id).await? {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
    }

    let password_changed = update.password_hash.is_some();

    let user = User::update(&state.db, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, password_changed, "Settings updated");

    Ok(Json(UserResponse { user }))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    if !User::delete(&state.db, auth.user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, "Account deleted");

    Ok(MessageResponse::new("Account deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_profile_picture_null_vs_missing() {
        let missing: SettingsRequest = serde_json::from_str(r#"{"name":"A"}"#).unwrap();
        assert!(missing.profile_picture.is_none());

        let cleared: SettingsRequest = serde_json::from_str(r#"{"profile_picture":null}"#).unwrap();
        assert_eq!(cleared.profile_picture, Some(None));

        let set: SettingsRequest =
            serde_json::from_str(r#"{"profile_picture":"data:image/png;base64,AA"}"#).unwrap();
        assert!(matches!(set.profile_picture, Some(Some(_))));
    }

    #[test]
    fn test_plan_settings_normalizes_username() {
        let update = plan_settings(SettingsRequest {
            username: Some("  NewName ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(update.username.as_deref(), Some("newname"));
    }

    #[test]
    fn test_plan_settings_rejects_bad_input() {
        let short_password = plan_settings(SettingsRequest {
            new_password: Some("123".to_string()),
            ..Default::default()
        });
        assert_eq!(short_password.unwrap_err().status_code(), StatusCode::BAD_REQUEST);

        let blank_default = plan_settings(SettingsRequest {
            default_note_name: Some("  ".to_string()),
            ..Default::default()
        });
        assert!(blank_default.is_err());

        let blank_name = plan_settings(SettingsRequest {
            name: Some(String::new()),
            ..Default::default()
        });
        assert!(blank_name.is_err());
    }

    #[test]
    fn test_plan_settings_hashes_new_password() {
        let update = plan_settings(SettingsRequest {
            new_password: Some("better-password".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(update.password_hash.unwrap().starts_with("$argon2id$"));
    }
}
