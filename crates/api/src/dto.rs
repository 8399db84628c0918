//! Wire representations of listed entities.
//!
//! Amounts leave the API as decimal major units. The owner is implied by
//! the request and is not repeated in nodes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tally_core::models::{
    Budget, Category, CategoryRollup, Identifier, MonthlyRollup, Transaction, ValueCodec,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub id: Identifier,
    pub name: String,
    pub is_meta: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Category> for CategoryNode {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            is_meta: category.is_meta,
            created_at: category.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionNode {
    pub id: Identifier,
    pub category_id: Option<Identifier>,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionNode {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            category_id: transaction.category_id,
            description: transaction.description,
            value: ValueCodec::to_major_units(transaction.value),
            date: transaction.date,
            created_at: transaction.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetNode {
    pub id: Identifier,
    pub category_id: Identifier,
    pub year: i32,
    pub month: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Budget> for BudgetNode {
    fn from(budget: Budget) -> Self {
        Self {
            id: budget.id,
            category_id: budget.category_id,
            year: budget.year,
            month: budget.month,
            value: ValueCodec::to_major_units(budget.value),
            created_at: budget.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRollupNode {
    /// Identifier of the category.
    pub id: Identifier,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub budgeted: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spent: Decimal,
}

impl From<CategoryRollup> for CategoryRollupNode {
    fn from(rollup: CategoryRollup) -> Self {
        Self {
            id: rollup.id,
            name: rollup.name,
            budgeted: ValueCodec::to_major_units(rollup.budgeted),
            spent: ValueCodec::to_major_units(rollup.spent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRollupNode {
    pub month: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub budgeted: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spent: Decimal,
}

impl From<MonthlyRollup> for MonthlyRollupNode {
    fn from(rollup: MonthlyRollup) -> Self {
        Self {
            month: rollup.month,
            budgeted: ValueCodec::to_major_units(rollup.budgeted),
            spent: ValueCodec::to_major_units(rollup.spent),
        }
    }
}

/// Response of `GET /rollups/months`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub months: Vec<MonthlyRollupNode>,
}
