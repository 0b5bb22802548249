/// Middleware modules for the API server
///
/// - `auth`: bearer-token and admin-only layers
/// - `security`: hardening response headers

pub mod auth;
pub mod security;
