/// User model and database operations
///
/// Users own notes, send and receive share records, and may be flagged as
/// admins or banned.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     username CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     profile_picture TEXT,
///     is_admin BOOLEAN NOT NULL DEFAULT FALSE,
///     is_banned BOOLEAN NOT NULL DEFAULT FALSE,
///     default_note_name VARCHAR(200) NOT NULL DEFAULT 'Untitled Note',
///     reset_token_hash CHAR(64),
///     reset_token_expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Usernames are stored lowercase and compared case-insensitively (CITEXT),
/// so `Alice` and `alice` can never both exist.
///
/// # Example
///
/// ```no_run
/// use notex_shared::models::user::{User, CreateUser};
/// use notex_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada Lovelace".to_string(),
///     username: "Ada".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     profile_picture: None,
///     is_admin: false,
/// }).await?;
///
/// // Lookups ignore case
/// let found = User::find_by_username(&pool, "ADA").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Title used for new notes when neither the request nor the user provides one
pub const DEFAULT_NOTE_NAME: &str = "Untitled Note";

/// Maximum number of results returned by a username search
pub const SEARCH_LIMIT: i64 = 10;

const USER_COLUMNS: &str = "id, name, username::text AS username, password_hash, profile_picture, \
     is_admin, is_banned, default_note_name, reset_token_hash, reset_token_expires_at, \
     created_at, updated_at";

/// User account
///
/// Secrets (`password_hash`, `reset_token_hash`) are never serialized, so a
/// `User` can be returned from handlers as-is.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Login name, always lowercase
    pub username: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Optional profile image (typically a data URL)
    pub profile_picture: Option<String>,

    /// Administrators can list and ban users, and cannot be banned
    pub is_admin: bool,

    /// Banned users cannot log in
    pub is_banned: bool,

    /// Title given to new notes created without one
    pub default_note_name: String,

    /// SHA-256 hex of the outstanding password-reset token
    #[serde(skip_serializing, default)]
    pub reset_token_hash: Option<String>,

    /// When the outstanding reset token stops being accepted
    #[serde(skip_serializing, default)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,

    /// Normalized before insert
    pub username: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub profile_picture: Option<String>,

    pub is_admin: bool,
}

/// Partial update for a user's own settings
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,

    /// Normalized before write
    pub username: Option<String>,

    /// Use `Some(None)` to clear the picture
    pub profile_picture: Option<Option<String>>,

    pub default_note_name: Option<String>,

    pub password_hash: Option<String>,
}

impl UpdateUser {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.profile_picture.is_none()
            && self.default_note_name.is_none()
            && self.password_hash.is_none()
    }
}

/// Row returned by the admin user listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserWithNoteCount {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub is_admin: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
    pub note_count: i64,
}

/// Public profile returned by searches and share notifications
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub profile_picture: Option<String>,
}

/// Case-folds a username for storage and comparison
///
/// # Example
///
/// ```
/// use notex_shared::models::user::normalize_username;
///
/// assert_eq!(normalize_username("  Alice "), "alice");
/// ```
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Checks a normalized username against the allowed shape
///
/// 3 to 32 characters from `[a-z0-9_.-]`.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err("Username must be between 3 and 32 characters".to_string());
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    {
        return Err(
            "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        );
    }

    Ok(())
}

impl User {
    /// Creates a new user
    ///
    /// The username is normalized before insert.
    ///
    /// # Errors
    ///
    /// Returns a database error on unique violation (`users_username_key`)
    /// when the username is already taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, username, password_hash, profile_picture, is_admin) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.name)
            .bind(normalize_username(&data.username))
            .bind(data.password_hash)
            .bind(data.profile_picture)
            .bind(data.is_admin)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by username, ignoring case
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use notex_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_username(&pool, "Alice").await? {
    ///     assert_eq!(user.username, "alice");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_username(username))
            .fetch_optional(pool)
            .await
    }

    /// Returns true if another user already holds `username`
    pub async fn username_taken_by_other(
        pool: &PgPool,
        username: &str,
        exclude_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND id <> $2)",
        )
        .bind(normalize_username(username))
        .bind(exclude_id)
        .fetch_one(pool)
        .await
    }

    /// Applies a partial settings update
    ///
    /// Returns `None` if the user does not exist. An empty update just
    /// re-reads the row.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.username.is_some() {
            bind_count += 1;
            query.push_str(&format!(", username = ${}", bind_count));
        }
        if data.profile_picture.is_some() {
            bind_count += 1;
            query.push_str(&format!(", profile_picture = ${}", bind_count));
        }
        if data.default_note_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", default_note_name = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(username) = data.username {
            q = q.bind(normalize_username(&username));
        }
        if let Some(picture) = data.profile_picture {
            q = q.bind(picture);
        }
        if let Some(default_note_name) = data.default_note_name {
            q = q.bind(default_note_name);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }

        q.fetch_optional(pool).await
    }

    /// Sets or clears the banned flag
    ///
    /// Admins are never touched: the guard lives in the WHERE clause, so the
    /// call returns `false` for an admin target even if the caller skipped
    /// [`User::ensure_bannable`].
    pub async fn set_banned(pool: &PgPool, id: Uuid, banned: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_banned = $2, updated_at = NOW()
            WHERE id = $1 AND is_admin = FALSE
            "#,
        )
        .bind(id)
        .bind(banned)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Rejects ban requests that target an administrator
    pub fn ensure_bannable(&self) -> Result<(), String> {
        if self.is_admin {
            return Err("Cannot ban admin users".to_string());
        }
        Ok(())
    }

    /// Stores the hash of a freshly issued reset token
    pub async fn set_reset_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token_hash = $2, reset_token_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds the user holding an unexpired reset token
    pub async fn find_by_reset_token(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users \
             WHERE reset_token_hash = $1 AND reset_token_expires_at > NOW()",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the password hash and consumes the reset token
    pub async fn reset_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user
    ///
    /// Notes and share records cascade.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists every user with their note count, newest first
    pub async fn list_with_note_counts(
        pool: &PgPool,
    ) -> Result<Vec<UserWithNoteCount>, sqlx::Error> {
        sqlx::query_as::<_, UserWithNoteCount>(
            r#"
            SELECT u.id, u.name, u.username::text AS username, u.profile_picture,
                   u.is_admin, u.is_banned, u.created_at,
                   COUNT(n.id) AS note_count
            FROM users u
            LEFT JOIN notes n ON n.author_id = u.id
            GROUP BY u.id
            ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Searches usernames by substring
    ///
    /// Excludes `exclude_id` (the caller) and banned users. At most
    /// [`SEARCH_LIMIT`] rows.
    pub async fn search_by_username(
        pool: &PgPool,
        query: &str,
        exclude_id: Uuid,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let pattern = format!("%{}%", escape_like(&normalize_username(query)));

        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, username::text AS username, profile_picture
            FROM users
            WHERE username LIKE $1 ESCAPE '\'
              AND id <> $2
              AND is_banned = FALSE
            ORDER BY username
            LIMIT $3
            "#,
        )
        .bind(pattern)
        .bind(exclude_id)
        .bind(SEARCH_LIMIT)
        .fetch_all(pool)
        .await
    }

    /// Public profile view
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
