/// Password-reset tokens
///
/// An admin issues a token for a user, hands it over out of band, and the
/// user trades it for a new password. Only the SHA-256 hex of the token is
/// stored, next to an expiry one hour out.
///
/// # Token Format
///
/// `nrt_` followed by 40 base62 characters (`[A-Za-z0-9]`).
///
/// # Example
///
/// ```
/// use notex_shared::auth::reset_token::{generate_reset_token, hash_reset_token};
///
/// let issued = generate_reset_token();
/// assert!(issued.token.starts_with("nrt_"));
/// assert_eq!(hash_reset_token(&issued.token), issued.hash);
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_PREFIX: &str = "nrt_";

const TOKEN_RANDOM_LENGTH: usize = 40;

/// Total length of a reset token (prefix + random)
pub const RESET_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// How long a reset token stays valid
pub fn reset_token_ttl() -> Duration {
    Duration::hours(1)
}

/// Freshly generated token, its storage hash and its expiry
#[derive(Debug, Clone)]
pub struct IssuedResetToken {
    /// Plaintext, shown once to the admin
    pub token: String,

    /// SHA-256 hex, persisted
    pub hash: String,

    pub expires_at: DateTime<Utc>,
}

/// Generates a new reset token expiring [`reset_token_ttl`] from now
pub fn generate_reset_token() -> IssuedResetToken {
    let token = format!("{}{}", TOKEN_PREFIX, generate_random_string(TOKEN_RANDOM_LENGTH));
    let hash = hash_reset_token(&token);

    IssuedResetToken {
        token,
        hash,
        expires_at: Utc::now() + reset_token_ttl(),
    }
}

/// Random base62 string
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Hex-encoded SHA-256 of a token (64 characters)
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check run before touching the database
pub fn validate_reset_token_format(token: &str) -> bool {
    token.len() == RESET_TOKEN_LENGTH
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_token() {
        let issued = generate_reset_token();

        assert_eq!(issued.token.len(), RESET_TOKEN_LENGTH);
        assert_eq!(issued.hash.len(), 64);
        assert!(validate_reset_token_format(&issued.token));
        assert_eq!(hash_reset_token(&issued.token), issued.hash);
    }

    #[test]
    fn test_expiry_is_one_hour_out() {
        let issued = generate_reset_token();
        let remaining = issued.expires_at - Utc::now();

        assert!(remaining <= Duration::hours(1));
        assert!(remaining > Duration::minutes(59));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a.token, b.token);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_reset_token("nrt_abc"), hash_reset_token("nrt_abc"));
        assert_ne!(hash_reset_token("nrt_abc"), hash_reset_token("nrt_abd"));
    }

    #[test]
    fn test_validate_format() {
        assert!(!validate_reset_token_format("nrt_short"));
        assert!(!validate_reset_token_format(&format!("xxx_{}", "a".repeat(40))));
        assert!(!validate_reset_token_format(&format!("nrt_{}!", "a".repeat(39))));
        assert!(validate_reset_token_format(&format!("nrt_{}", "a".repeat(40))));
    }
}
