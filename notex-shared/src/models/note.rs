/// Note model and database operations
///
/// A note belongs to exactly one author. It may be locked behind a password
/// whose Argon2id hash is stored in `lock_hash`; while locked, the content is
/// withheld from reads until the password is supplied.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     content TEXT NOT NULL DEFAULT '',
///     is_locked BOOLEAN NOT NULL DEFAULT FALSE,
///     lock_hash VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (NOT is_locked OR lock_hash IS NOT NULL)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use notex_shared::models::note::{Note, CreateNote};
/// use notex_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(author_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let note = Note::create(&pool, CreateNote {
///     author_id,
///     title: "Groceries".to_string(),
///     content: "milk, eggs".to_string(),
/// }).await?;
///
/// let mine = Note::list_by_author(&pool, author_id).await?;
/// assert!(mine.iter().any(|n| n.id == note.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::password::{verify_password, PasswordError};

/// Maximum title length in characters
pub const MAX_TITLE_LENGTH: usize = 200;

const NOTE_COLUMNS: &str =
    "id, author_id, title, content, is_locked, lock_hash, created_at, updated_at";

/// Stored note
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,

    /// Owner
    pub author_id: Uuid,

    pub title: String,

    pub content: String,

    pub is_locked: bool,

    /// Argon2id hash of the lock password
    #[serde(skip_serializing, default)]
    pub lock_hash: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Note as returned to clients
///
/// `content` is `None` while the note is locked and has not been unlocked
/// for this response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNote {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

/// Partial update for a note
///
/// `lock_hash` uses `Some(None)` to clear the lock password.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_locked: Option<bool>,
    pub lock_hash: Option<Option<String>>,
}

impl UpdateNote {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.is_locked.is_none()
            && self.lock_hash.is_none()
    }
}

impl Note {
    /// Creates a note
    pub async fn create(pool: &PgPool, data: CreateNote) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO notes (author_id, title, content) VALUES ($1, $2, $3) RETURNING {}",
            NOTE_COLUMNS
        );

        sqlx::query_as::<_, Note>(&query)
            .bind(data.author_id)
            .bind(data.title)
            .bind(data.content)
            .fetch_one(pool)
            .await
    }

    /// Creates a note inside an open transaction
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        data: CreateNote,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO notes (author_id, title, content) VALUES ($1, $2, $3) RETURNING {}",
            NOTE_COLUMNS
        );

        sqlx::query_as::<_, Note>(&query)
            .bind(data.author_id)
            .bind(data.title)
            .bind(data.content)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS);

        sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists an author's notes, most recently updated first
    pub async fn list_by_author(pool: &PgPool, author_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM notes WHERE author_id = $1 ORDER BY updated_at DESC, created_at DESC",
            NOTE_COLUMNS
        );

        sqlx::query_as::<_, Note>(&query)
            .bind(author_id)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the note does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateNote,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut query = String::from("UPDATE notes SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.content.is_some() {
            bind_count += 1;
            query.push_str(&format!(", content = ${}", bind_count));
        }
        if data.is_locked.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_locked = ${}", bind_count));
        }
        if data.lock_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", lock_hash = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", NOTE_COLUMNS));

        let mut q = sqlx::query_as::<_, Note>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(content) = data.content {
            q = q.bind(content);
        }
        if let Some(is_locked) = data.is_locked {
            q = q.bind(is_locked);
        }
        if let Some(lock_hash) = data.lock_hash {
            q = q.bind(lock_hash);
        }

        q.fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Input for an independent, unlocked copy owned by `receiver_id`
    ///
    /// Only title and content carry over.
    pub fn copy_for(&self, receiver_id: Uuid) -> CreateNote {
        CreateNote {
            author_id: receiver_id,
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }

    /// Checks a candidate lock password
    ///
    /// An unlocked note accepts anything. A locked note without a stored hash
    /// accepts nothing.
    pub fn verify_lock(&self, password: &str) -> Result<bool, PasswordError> {
        if !self.is_locked {
            return Ok(true);
        }

        match &self.lock_hash {
            Some(hash) => verify_password(password, hash),
            None => Ok(false),
        }
    }

    /// Client view, withholding content while locked
    pub fn view(&self) -> NoteView {
        NoteView {
            content: if self.is_locked {
                None
            } else {
                Some(self.content.clone())
            },
            ..self.unlocked_view()
        }
    }

    /// Client view including content regardless of lock state
    pub fn unlocked_view(&self) -> NoteView {
        NoteView {
            id: self.id,
            author_id: self.author_id,
            title: self.title.clone(),
            content: Some(self.content.clone()),
            is_locked: self.is_locked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
