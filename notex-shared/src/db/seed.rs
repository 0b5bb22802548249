/// Startup seeding of the administrator account
///
/// Idempotent: an existing account with the admin username is left alone,
/// even if it is not currently an admin or its password differs.

use sqlx::PgPool;
use tracing::{debug, info};

use crate::auth::password::{hash_password, validate_password, PasswordError};
use crate::models::user::{normalize_username, validate_username, CreateUser, User};

/// Credentials for the seeded admin
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Invalid admin seed: {0}")]
    Invalid(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AdminSeed {
    fn validate(&self) -> Result<(), SeedError> {
        validate_username(&normalize_username(&self.username)).map_err(SeedError::Invalid)?;
        validate_password(&self.password).map_err(SeedError::Invalid)?;
        if self.name.trim().is_empty() {
            return Err(SeedError::Invalid("Admin name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Creates the admin account if no user holds its username
///
/// Returns the created user, or `None` when the account already existed.
pub async fn ensure_admin(pool: &PgPool, seed: &AdminSeed) -> Result<Option<User>, SeedError> {
    seed.validate()?;

    if User::find_by_username(pool, &seed.username).await?.is_some() {
        debug!(username = %normalize_username(&seed.username), "Admin account already present");
        return Ok(None);
    }

    let user = User::create(
        pool,
        CreateUser {
            name: seed.name.trim().to_string(),
            username: seed.username.clone(),
            password_hash: hash_password(&seed.password)?,
            profile_picture: None,
            is_admin: true,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "Seeded admin account");
    Ok(Some(user))
}
