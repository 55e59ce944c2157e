//! PostgreSQL access layer for DentaCare Engine.
//!
//! Owns the connection pool, transactions, schema migrations and the small
//! set of query helpers (pagination, `ILIKE` escaping, unique-violation
//! detection, id-or-secondary-key parsing) that every repository shares.
//!
//! ```rust,no_run
//! use database_layer::{run_migrations, DatabaseConfig, DatabasePool};
//!
//! # async fn demo() -> Result<(), database_layer::DatabaseError> {
//! let pool = DatabasePool::connect(&DatabaseConfig::default()).await?;
//! run_migrations(&pool).await?;
//! let mut tx = pool.begin().await?;
//! sqlx::query("SELECT 1").execute(&mut *tx).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod migration;
pub mod query;
pub mod types;

pub use connection::{DatabaseConfig, DatabasePool};
pub use error::{DatabaseError, DatabaseResult};
pub use migration::run_migrations;
pub use query::{contains_ignore_case, is_unique_violation, like_pattern, Page, PageRequest, RecordKey};

// Re-exported for `impl_text_enum!` expansions in dependent crates.
pub use sqlx;
