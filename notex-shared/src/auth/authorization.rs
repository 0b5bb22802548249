/// Authorization checks
///
/// Two rules cover every protected operation: a note may only be touched by
/// its author, and admin endpoints require the admin flag.
///
/// # Example
///
/// ```no_run
/// use notex_shared::auth::authorization::{load_owned_note, require_admin};
/// use notex_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, auth: AuthContext, note_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let note = load_owned_note(&pool, &auth, note_id).await?;
/// require_admin(&auth)?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::note::Note;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller is not an administrator
    #[error("Admin access required")]
    NotAdmin,

    /// Caller does not own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    /// Note does not exist, or belongs to someone else
    #[error("Note not found")]
    NoteNotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.is_admin {
        return Err(AuthzError::NotAdmin);
    }
    Ok(())
}

pub fn require_ownership(auth: &AuthContext, resource_owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id != resource_owner_id {
        return Err(AuthzError::NotAuthorized);
    }
    Ok(())
}

/// Loads a note the caller owns
///
/// Someone else's note is reported as missing so that note ids cannot be
/// probed.
pub async fn load_owned_note(
    pool: &PgPool,
    auth: &AuthContext,
    note_id: Uuid,
) -> Result<Note, AuthzError> {
    let note = Note::find_by_id(pool, note_id)
        .await?
        .ok_or(AuthzError::NoteNotFound)?;

    require_ownership(auth, note.author_id).map_err(|_| AuthzError::NoteNotFound)?;

    Ok(note)
}
