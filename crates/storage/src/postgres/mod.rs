//! PostgreSQL storage adapter.
//!
//! This module implements the keyset sources defined in `tally-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - Individual sources: `PgCategoryRepository`, `PgTransactionRepository`, etc.
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(&db);
//! ```

mod budget_repo;
mod category_repo;
mod database;
mod helpers;
mod rollup_repo;
mod transaction_repo;

pub use budget_repo::PgBudgetRepository;
pub use category_repo::PgCategoryRepository;
pub use database::{Database, DatabaseConfig};
pub use rollup_repo::PgRollupRepository;
pub use transaction_repo::PgTransactionRepository;

use async_trait::async_trait;

use tally_core::error::StorageResult;
use tally_core::models::MonthlyRollup;
use tally_core::ports::{
    BudgetSource, CategoryRollupSource, CategorySource, Repositories, TransactionSource,
    YearFilter,
};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
pub struct PgRepositories {
    categories: PgCategoryRepository,
    transactions: PgTransactionRepository,
    budgets: PgBudgetRepository,
    rollups: PgRollupRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            categories: PgCategoryRepository::new(pool.clone()),
            transactions: PgTransactionRepository::new(pool.clone()),
            budgets: PgBudgetRepository::new(pool.clone()),
            rollups: PgRollupRepository::new(pool),
        }
    }
}

#[async_trait]
impl Repositories for PgRepositories {
    fn categories(&self) -> &CategorySource {
        &self.categories
    }

    fn transactions(&self) -> &TransactionSource {
        &self.transactions
    }

    fn budgets(&self) -> &BudgetSource {
        &self.budgets
    }

    fn category_rollups(&self) -> &CategoryRollupSource {
        &self.rollups
    }

    async fn monthly_rollups(&self, filter: YearFilter) -> StorageResult<Vec<MonthlyRollup>> {
        self.rollups.monthly(filter).await
    }
}
