//! # NoteX API Server Library
//!
//! Core of the NoteX notes service: accounts, private notes with optional
//! lock passwords, note sharing by copy, and administration.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Authentication and security header layers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
