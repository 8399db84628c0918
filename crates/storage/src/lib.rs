//! Storage layer for the Tally finance API.
//!
//! This crate provides PostgreSQL implementations of the keyset sources
//! defined in `tally-core`. It owns connection pooling, migrations and the
//! SQL behind every paginated listing.
//!
//! # Architecture
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::PgRepositories`] - Composite repository for all collections
//! - One keyset source per collection (categories, transactions, budgets,
//!   category rollups), all scoped to a single owner
//!
//! # Usage
//!
//! ```ignore
//! use tally_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = Arc::new(PgRepositories::new(&db));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, PgRepositories};
