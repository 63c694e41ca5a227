//! Persistence layer modules.

pub mod bundle_repo;
pub mod db;
pub mod schema;
pub mod settings_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
