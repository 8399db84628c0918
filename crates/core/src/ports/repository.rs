//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `tally-storage`).
//!
//! Every paginated collection is exposed as a [`KeysetSource`]: a filtered
//! set with a total order on its sort key, which can locate a row's key,
//! scan past a key in either direction, and count itself.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StorageResult;
use crate::models::{
    Budget, Category, CategoryRollup, Identified, Identifier, MonthlyRollup, Transaction,
};

use super::pagination::OrderDirection;

// =============================================================================
// Sort Keys
// =============================================================================

/// Sort key of collections ordered by insertion time.
///
/// The identifier breaks ties between rows created in the same instant,
/// which keeps the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InsertionKey {
    pub created_at: DateTime<Utc>,
    pub id: Identifier,
}

// =============================================================================
// Filter Types
// =============================================================================

/// Filter options for category listings.
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    pub owner_id: Identifier,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    pub is_meta: Option<bool>,
}

/// How transactions are narrowed by their own fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubjectFilter {
    #[default]
    All,
    /// Case-insensitive substring of the description.
    Search(String),
    /// Inclusive range of values, in minor units.
    ValueRange { min: i64, max: i64 },
}

/// Which categories a transaction listing includes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategorySelection {
    #[default]
    All,
    Uncategorized,
    Only(Vec<Identifier>),
}

/// Filter options for transaction listings.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub owner_id: Identifier,
    pub subject: SubjectFilter,
    pub categories: CategorySelection,
    /// Inclusive lower bound on the booking date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the booking date.
    pub date_to: Option<NaiveDate>,
}

/// Filter for year-scoped listings (budgets and rollups).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearFilter {
    pub owner_id: Identifier,
    pub year: i32,
}

// =============================================================================
// Keyset Source
// =============================================================================

/// One bounded, ordered fetch against a keyset source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetScan<K> {
    /// Exclusive bound. Rows must sort after it for `Asc`, before it for `Desc`.
    pub bound: Option<K>,
    pub order: OrderDirection,
    pub limit: usize,
}

/// A filtered collection that supports keyset pagination.
#[async_trait]
pub trait KeysetSource: Send + Sync {
    /// Rows returned by scans.
    type Node: Identified + Send;
    /// Total order used for paging.
    type Key: Clone + Send + Sync;
    /// Entity-specific filter, ANDed into every operation.
    type Filter: Send + Sync;

    /// Collection name used in logs and metrics.
    fn collection(&self) -> &'static str;

    /// Sort key of the row with this identifier, if it is in the filtered set.
    async fn locate(&self, filter: &Self::Filter, id: Identifier)
    -> StorageResult<Option<Self::Key>>;

    /// Rows of the filtered set past the bound, in scan order.
    async fn scan(
        &self,
        filter: &Self::Filter,
        scan: KeysetScan<Self::Key>,
    ) -> StorageResult<Vec<Self::Node>>;

    /// Size of the filtered set, ignoring any bound.
    async fn count(&self, filter: &Self::Filter) -> StorageResult<u64>;
}

/// Categories ordered by identifier.
pub type CategorySource = dyn KeysetSource<Node = Category, Key = Identifier, Filter = CategoryFilter>;

/// Transactions ordered by insertion time.
pub type TransactionSource =
    dyn KeysetSource<Node = Transaction, Key = InsertionKey, Filter = TransactionFilter>;

/// Budgets ordered by insertion time.
pub type BudgetSource = dyn KeysetSource<Node = Budget, Key = InsertionKey, Filter = YearFilter>;

/// Per-category rollups ordered by category identifier.
pub type CategoryRollupSource =
    dyn KeysetSource<Node = CategoryRollup, Key = Identifier, Filter = YearFilter>;

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined read access for the API layer.
#[async_trait]
pub trait Repositories: Send + Sync {
    /// Access the category listing.
    fn categories(&self) -> &CategorySource;

    /// Access the transaction listing.
    fn transactions(&self) -> &TransactionSource;

    /// Access the budget listing.
    fn budgets(&self) -> &BudgetSource;

    /// Access the per-category rollup listing.
    fn category_rollups(&self) -> &CategoryRollupSource;

    /// Budget versus actuals for each month of a year.
    ///
    /// Always returns twelve entries, months without data included.
    async fn monthly_rollups(&self, filter: YearFilter) -> StorageResult<Vec<MonthlyRollup>>;
}
