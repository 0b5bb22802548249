/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: signup, login, refresh, me, password reset
/// - `notes`: note CRUD, unlock and share
/// - `notifications`: pending shares and accept/reject
/// - `users`: own settings and account deletion
/// - `search`: username search
/// - `admin`: user listing, bans and reset tokens

pub mod admin;
pub mod auth;
pub mod health;
pub mod notes;
pub mod notifications;
pub mod search;
pub mod users;
