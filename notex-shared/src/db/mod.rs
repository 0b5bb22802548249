/// Database layer for NoteX
///
/// # Modules
///
/// - `pool`: connection pool and health check
/// - `migrations`: embedded schema migrations
/// - `seed`: startup creation of the admin account
///
/// Models are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
pub mod seed;
