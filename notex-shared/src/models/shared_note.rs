/// Share records and the accept/reject workflow
///
/// Sharing never grants access to the original note. A share record is an
/// offer: when the receiver accepts, an independent unlocked copy is created
/// for them; when they reject, nothing is copied. Either way the record
/// leaves the `pending` state for good.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE share_status AS ENUM ('pending', 'accepted', 'rejected');
///
/// CREATE TABLE shared_notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     note_id UUID NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
///     sender_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     receiver_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     status share_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (sender_id <> receiver_id)
/// );
///
/// CREATE UNIQUE INDEX shared_notes_one_pending
///     ON shared_notes (note_id, receiver_id) WHERE status = 'pending';
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::note::Note;
use super::user::UserSummary;

/// Lifecycle state of a share record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ShareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareStatus::Pending => "pending",
            ShareStatus::Accepted => "accepted",
            ShareStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver's answer to a pending share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SharedNote {
    pub id: Uuid,
    pub note_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: ShareStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSharedNote {
    pub note_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
}

/// Pending share as shown in the receiver's notification list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub note_id: Uuid,
    pub note_title: String,
    pub sender: UserSummary,
    pub status: ShareStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    note_id: Uuid,
    note_title: String,
    sender_id: Uuid,
    sender_name: String,
    sender_username: String,
    sender_profile_picture: Option<String>,
    status: ShareStatus,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            note_id: row.note_id,
            note_title: row.note_title,
            sender: UserSummary {
                id: row.sender_id,
                name: row.sender_name,
                username: row.sender_username,
                profile_picture: row.sender_profile_picture,
            },
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Why a share could not be accepted or rejected
#[derive(Debug, thiserror::Error)]
pub enum ShareTransitionError {
    #[error("Share not found")]
    NotFound,

    #[error("Only the receiver can respond to this share")]
    NotReceiver,

    #[error("Share has already been {0}")]
    NotPending(ShareStatus),

    #[error("Shared note no longer exists")]
    NoteGone,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Checks that `receiver_id` may act on `share` right now
pub fn ensure_actionable(share: &SharedNote, receiver_id: Uuid) -> Result<(), ShareTransitionError> {
    if share.receiver_id != receiver_id {
        return Err(ShareTransitionError::NotReceiver);
    }
    if share.status != ShareStatus::Pending {
        return Err(ShareTransitionError::NotPending(share.status));
    }
    Ok(())
}

const SHARE_COLUMNS: &str = "id, note_id, sender_id, receiver_id, status, created_at, updated_at";

impl SharedNote {
    /// Creates a pending share
    ///
    /// # Errors
    ///
    /// Unique violation on `shared_notes_one_pending` if the same note is
    /// already pending for the same receiver.
    pub async fn create(pool: &PgPool, data: CreateSharedNote) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO shared_notes (note_id, sender_id, receiver_id) \
             VALUES ($1, $2, $3) RETURNING {}",
            SHARE_COLUMNS
        );

        sqlx::query_as::<_, SharedNote>(&query)
            .bind(data.note_id)
            .bind(data.sender_id)
            .bind(data.receiver_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM shared_notes WHERE id = $1", SHARE_COLUMNS);

        sqlx::query_as::<_, SharedNote>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the pending share of `note_id` to `receiver_id`, if any
    pub async fn find_pending(
        pool: &PgPool,
        note_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM shared_notes \
             WHERE note_id = $1 AND receiver_id = $2 AND status = 'pending'",
            SHARE_COLUMNS
        );

        sqlx::query_as::<_, SharedNote>(&query)
            .bind(note_id)
            .bind(receiver_id)
            .fetch_optional(pool)
            .await
    }

    /// Pending shares addressed to `receiver_id`, newest first
    pub async fn list_pending_for_receiver(
        pool: &PgPool,
        receiver_id: Uuid,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT s.id, s.note_id, n.title AS note_title,
                   u.id AS sender_id, u.name AS sender_name,
                   u.username::text AS sender_username,
                   u.profile_picture AS sender_profile_picture,
                   s.status, s.created_at
            FROM shared_notes s
            JOIN notes n ON n.id = s.note_id
            JOIN users u ON u.id = s.sender_id
            WHERE s.receiver_id = $1 AND s.status = 'pending'
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(receiver_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Accepts a pending share, returning the receiver's new copy
    ///
    /// Runs in one transaction: the share row is locked, checked, the copy is
    /// inserted, and the status flips to `accepted`. The original note is
    /// only read.
    pub async fn accept(
        pool: &PgPool,
        id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Note, ShareTransitionError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {} FROM shared_notes WHERE id = $1 FOR UPDATE", SHARE_COLUMNS);
        let share = sqlx::query_as::<_, SharedNote>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ShareTransitionError::NotFound)?;

        ensure_actionable(&share, receiver_id)?;

        let original = sqlx::query_as::<_, Note>(
            "SELECT id, author_id, title, content, is_locked, lock_hash, created_at, updated_at \
             FROM notes WHERE id = $1",
        )
        .bind(share.note_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ShareTransitionError::NoteGone)?;

        let copy = Note::create_in_tx(&mut tx, original.copy_for(receiver_id)).await?;

        let updated = sqlx::query(
            "UPDATE shared_notes SET status = 'accepted', updated_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Status changed under us; drop the copy
            tx.rollback().await?;
            return Err(ShareTransitionError::NotPending(share.status));
        }

        tx.commit().await?;

        tracing::info!(
            share_id = %id,
            original_note_id = %original.id,
            copy_note_id = %copy.id,
            receiver_id = %receiver_id,
            "Share accepted"
        );

        Ok(copy)
    }

    /// Rejects a pending share
    pub async fn reject(
        pool: &PgPool,
        id: Uuid,
        receiver_id: Uuid,
    ) -> Result<(), ShareTransitionError> {
        let share = Self::find_by_id(pool, id)
            .await?
            .ok_or(ShareTransitionError::NotFound)?;

        ensure_actionable(&share, receiver_id)?;

        let updated = sqlx::query(
            "UPDATE shared_notes SET status = 'rejected', updated_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            // Lost a race with a concurrent accept or reject
            let current = Self::find_by_id(pool, id)
                .await?
                .map(|s| s.status)
                .unwrap_or(ShareStatus::Rejected);
            return Err(ShareTransitionError::NotPending(current));
        }

        tracing::info!(share_id = %id, receiver_id = %receiver_id, "Share rejected");
        Ok(())
    }
}
