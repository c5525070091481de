//! Database layer
//!
//! SQLite storage for posts, taxonomy, authors, media, settings, sessions and
//! visits. Schema changes are embedded migrations applied on startup; data
//! access goes through the repository traits in [`repositories`].

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, Database, DbPool};
