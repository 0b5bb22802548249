/// Share notifications
///
/// # Endpoints
///
/// - `GET /api/notifications` - Pending shares addressed to the caller
/// - `POST /api/notifications/:id` - `{ "action": "accept" | "reject" }`
///
/// Accepting creates an independent copy of the note for the caller; the
/// sender's note is never modified.

use crate::{app::AppState, error::ApiResult, routes::auth::MessageResponse};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use notex_shared::{
    auth::middleware::AuthContext,
    models::shared_note::{Notification, ShareAction, SharedNote},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationActionRequest {
    pub action: ShareAction,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<NotificationsResponse>> {
    let notifications = SharedNote::list_pending_for_receiver(&state.db, auth.user_id).await?;
    Ok(Json(NotificationsResponse { notifications }))
}

/// # Errors
///
/// - `403 Forbidden`: caller is not the receiver
/// - `404 Not Found`: unknown share, or the note was deleted
/// - `409 Conflict`: share already accepted or rejected
pub async fn act_on_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<NotificationActionRequest>,
) -> ApiResult<Json<MessageResponse>> {
    match req.action {
        ShareAction::Accept => {
            SharedNote::accept(&state.db, id, auth.user_id).await?;
            Ok(MessageResponse::new("Note accepted"))
        }
        ShareAction::Reject => {
            SharedNote::reject(&state.db, id, auth.user_id).await?;
            Ok(MessageResponse::new("Note rejected"))
        }
    }
}
