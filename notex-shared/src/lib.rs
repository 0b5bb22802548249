//! # NoteX Shared Library
//!
//! Data access and authentication shared by the NoteX API server.
//!
//! ## Module Organization
//!
//! - `models`: users, notes and share records
//! - `auth`: password hashing, JWTs, reset tokens, auth middleware
//! - `db`: pool, migrations, admin seeding

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the NoteX shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
