//! Domain models for the finance tracker.
//!
//! These models are storage-agnostic. Monetary fields always hold integer
//! minor units; conversion to display amounts happens at the API boundary
//! through [`ValueCodec`].

mod identifier;
mod money;

pub use identifier::{CursorCodec, Identifier};
pub use money::{MAJOR_UNIT_SCALE, ValueCodec};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identified entities
// =============================================================================

/// An entity that can appear as the node of a pagination edge.
pub trait Identified {
    /// The identifier used as the edge cursor.
    fn id(&self) -> Identifier;
}

// =============================================================================
// Entities
// =============================================================================

/// A user-defined transaction category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Identifier,
    pub owner_id: Identifier,
    pub name: String,
    /// Meta categories group other categories and never hold transactions
    /// of their own.
    pub is_meta: bool,
    pub created_at: DateTime<Utc>,
}

/// An imported bank or PayPal transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Identifier,
    pub owner_id: Identifier,
    /// `None` until the user categorizes the transaction.
    pub category_id: Option<Identifier>,
    pub description: String,
    /// Signed amount in minor units (negative for expenses).
    pub value: i64,
    /// Booking date as reported by the bank.
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A monthly budget for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Identifier,
    pub owner_id: Identifier,
    pub category_id: Identifier,
    pub year: i32,
    /// Month of the year, 1 to 12.
    pub month: u32,
    /// Budgeted amount in minor units.
    pub value: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Rollups
// =============================================================================

/// Budget versus actuals for one category over one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRollup {
    /// Identifier of the category.
    pub id: Identifier,
    pub name: String,
    /// Sum of the category's budgets for the year, in minor units.
    pub budgeted: i64,
    /// Net sum of the category's transaction values for the year.
    pub spent: i64,
}

/// Budget versus actuals for one month of a year, across all categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRollup {
    pub month: u32,
    pub budgeted: i64,
    pub spent: i64,
}

impl Identified for Category {
    fn id(&self) -> Identifier {
        self.id
    }
}

impl Identified for Transaction {
    fn id(&self) -> Identifier {
        self.id
    }
}

impl Identified for Budget {
    fn id(&self) -> Identifier {
        self.id
    }
}

impl Identified for CategoryRollup {
    fn id(&self) -> Identifier {
        self.id
    }
}
