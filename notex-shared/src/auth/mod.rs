/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id hashing for account and note-lock passwords
/// - [`jwt`]: access and refresh tokens
/// - [`reset_token`]: admin-issued password-reset tokens
/// - [`middleware`]: bearer-token middleware producing an `AuthContext`
/// - [`authorization`]: ownership and admin checks
///
/// # Example
///
/// ```no_run
/// use notex_shared::auth::password::{hash_password, verify_password};
/// use notex_shared::auth::jwt::issue_token_pair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
