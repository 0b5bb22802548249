/// Database models for NoteX
///
/// # Models
///
/// - `user`: accounts, admin and ban flags, reset tokens
/// - `note`: notes and their optional password lock
/// - `shared_note`: share offers and the accept/reject workflow
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
///     name: "Grace".to_string(),
///     username: "grace".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     profile_picture: None,
///     is_admin: false,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod note;
pub mod shared_note;
pub mod user;
