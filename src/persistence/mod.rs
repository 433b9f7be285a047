//! Persistence layer modules.

pub mod db;
pub mod executor;
pub mod schema;
pub mod seed;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
