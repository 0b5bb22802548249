/// Note endpoints
///
/// Every route is scoped to the caller's own notes; another user's note id
/// answers 404.
///
/// # Endpoints
///
/// - `GET /api/notes` - List own notes, most recently updated first
/// - `POST /api/notes` - Create a note
/// - `GET /api/notes/:id` - Fetch one note
/// - `PUT /api/notes/:id` - Edit title, content or lock state
/// - `DELETE /api/notes/:id` - Delete a note
/// - `POST /api/notes/:id/unlock` - Read a locked note's content
/// - `POST /api/notes/:id/share` - Offer a copy to another user
///
/// Locked notes are listed and fetched with `content: null`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::{field_error, MessageResponse},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use notex_shared::{
    auth::{
        authorization::load_owned_note,
        middleware::AuthContext,
        password::{hash_password, validate_lock_password},
    },
    models::{
        note::{CreateNote, Note, NoteView, UpdateNote, MAX_TITLE_LENGTH},
        shared_note::{CreateSharedNote, SharedNote},
        user::{User, DEFAULT_NOTE_NAME},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Partial note edit
///
/// `password` sets a new lock password and is only read together with
/// `is_locked: true`. `current_password` is required whenever the note is
/// locked and the edit touches content or lock state.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_locked: Option<bool>,
    pub password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub receiver_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<NoteView>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub note: NoteView,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub unlocked: bool,
    pub note: NoteView,
}

#[derive(Debug, Serialize)]
pub struct SharedNoteResponse {
    pub shared_note: SharedNote,
}

fn validate_title(title: &str) -> ApiResult<()> {
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(field_error(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LENGTH),
        ));
    }
    Ok(())
}

/// Picks the title for a new note
///
/// Request title if non-blank, else the user's default, else the global
/// default.
fn resolve_title(requested: Option<&str>, user_default: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| user_default.map(str::trim).filter(|t| !t.is_empty()))
        .unwrap_or(DEFAULT_NOTE_NAME)
        .to_string()
}

/// Turns an edit request into a column update, enforcing lock rules
///
/// # Errors
///
/// - `400`: locking without a password on a note that has none, or an
///   invalid title or lock password
/// - `401`: the note is locked, the edit touches content or lock state, and
///   `current_password` is missing or wrong
pub(crate) fn plan_update(note: &Note, req: &UpdateNoteRequest) -> ApiResult<UpdateNote> {
    let new_lock_password = match req.is_locked {
        Some(true) => req.password.as_deref(),
        _ => None,
    };

    let changes_lock = match req.is_locked {
        Some(locked) => locked != note.is_locked || new_lock_password.is_some(),
        None => false,
    };

    if note.is_locked && (req.content.is_some() || changes_lock) {
        let current = req
            .current_password
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("Current password is required".to_string()))?;

        if !note.verify_lock(current)? {
            return Err(ApiError::Unauthorized("Incorrect password".to_string()));
        }
    }

    let mut update = UpdateNote::default();

    if let Some(title) = &req.title {
        validate_title(title)?;
        update.title = Some(title.clone());
    }

    update.content = req.content.clone();

    match req.is_locked {
        Some(true) => {
            if let Some(password) = new_lock_password {
                validate_lock_password(password).map_err(|e| field_error("password", e))?;
                update.lock_hash = Some(Some(hash_password(password)?));
            } else if note.lock_hash.is_none() {
                return Err(ApiError::BadRequest(
                    "A password is required to lock a note".to_string(),
                ));
            }
            update.is_locked = Some(true);
        }
        Some(false) => {
            update.is_locked = Some(false);
            update.lock_hash = Some(None);
        }
        None => {}
    }

    Ok(update)
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<NotesResponse>> {
    let notes = Note::list_by_author(&state.db, auth.user_id).await?;

    Ok(Json(NotesResponse {
        notes: notes.iter().map(Note::view).collect(),
    }))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<NoteResponse>)> {
    let user_default = match req.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => None,
        _ => User::find_by_id(&state.db, auth.user_id)
            .await?
            .map(|u| u.default_note_name),
    };

    let title = resolve_title(req.title.as_deref(), user_default.as_deref());
    validate_title(&title)?;

    let note = Note::create(
        &state.db,
        CreateNote {
            author_id: auth.user_id,
            title,
            content: req.content.unwrap_or_default(),
        },
    )
    .await?;

    tracing::debug!(note_id = %note.id, user_id = %auth.user_id, "Note created");

    Ok((StatusCode::CREATED, Json(NoteResponse { note: note.view() })))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NoteResponse>> {
    let note = load_owned_note(&state.db, &auth, id).await?;
    Ok(Json(NoteResponse { note: note.view() }))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<Json<NoteResponse>> {
    let note = load_owned_note(&state.db, &auth, id).await?;
    let update = plan_update(&note, &req)?;

    let updated = Note::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    Ok(Json(NoteResponse {
        note: updated.view(),
    }))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    load_owned_note(&state.db, &auth, id).await?;

    if !Note::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Note not found".to_string()));
    }

    tracing::debug!(note_id = %id, user_id = %auth.user_id, "Note deleted");

    Ok(MessageResponse::new("Note deleted"))
}

/// Returns the note with its content if the password matches exactly
///
/// # Errors
///
/// - `401 Unauthorized`: password mismatch
pub async fn unlock_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UnlockRequest>,
) -> ApiResult<Json<UnlockResponse>> {
    let note = load_owned_note(&state.db, &auth, id).await?;

    if !note.verify_lock(&req.password)? {
        tracing::debug!(note_id = %id, "Unlock attempt with wrong password");
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    }

    Ok(Json(UnlockResponse {
        unlocked: true,
        note: note.unlocked_view(),
    }))
}

/// Offers a copy of the note to another user
///
/// # Errors
///
/// - `400 Bad Request`: sharing with yourself
/// - `404 Not Found`: unknown note or receiver
/// - `409 Conflict`: a pending share to the same receiver already exists
pub async fn share_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<(StatusCode, Json<SharedNoteResponse>)> {
    let note = load_owned_note(&state.db, &auth, id).await?;

    if req.receiver_id == auth.user_id {
        return Err(ApiError::BadRequest("You cannot share a note with yourself".to_string()));
    }

    if User::find_by_id(&state.db, req.receiver_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    if SharedNote::find_pending(&state.db, note.id, req.receiver_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Note is already shared with this user".to_string(),
        ));
    }

    let shared_note = SharedNote::create(
        &state.db,
        CreateSharedNote {
            note_id: note.id,
            sender_id: auth.user_id,
            receiver_id: req.receiver_id,
        },
    )
    .await?;

    tracing::info!(
        share_id = %shared_note.id,
        note_id = %note.id,
        sender_id = %auth.user_id,
        receiver_id = %req.receiver_id,
        "Note shared"
    );

    Ok((StatusCode::CREATED, Json(SharedNoteResponse { shared_note })))
}
