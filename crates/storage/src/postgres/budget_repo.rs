//! Budget listing for PostgreSQL, ordered by insertion time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use tally_core::error::StorageResult;
use tally_core::models::{Budget, Identifier};
use tally_core::ports::{InsertionKey, KeysetScan, KeysetSource, YearFilter};

use super::helpers::{count_from_row, month_from_row, order_sql, push_limit, query_err};

const BUDGET_COLUMNS: &str = "id, owner_id, category_id, year, month, value, created_at";

/// PostgreSQL budget listing.
pub struct PgBudgetRepository {
    pool: PgPool,
}

impl PgBudgetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &YearFilter) {
    qb.push(" WHERE owner_id = ")
        .push_bind(filter.owner_id.as_uuid())
        .push(" AND year = ")
        .push_bind(filter.year);
}

#[async_trait]
impl KeysetSource for PgBudgetRepository {
    type Node = Budget;
    type Key = InsertionKey;
    type Filter = YearFilter;

    fn collection(&self) -> &'static str {
        "budgets"
    }

    async fn locate(
        &self,
        filter: &YearFilter,
        id: Identifier,
    ) -> StorageResult<Option<InsertionKey>> {
        let mut qb = QueryBuilder::new("SELECT created_at, id FROM budgets");
        push_filter(&mut qb, filter);
        qb.push(" AND id = ").push_bind(id.as_uuid());

        let row: Option<(DateTime<Utc>, Uuid)> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err)?;

        Ok(row.map(|(created_at, id)| InsertionKey {
            created_at,
            id: id.into(),
        }))
    }

    async fn scan(
        &self,
        filter: &YearFilter,
        scan: KeysetScan<InsertionKey>,
    ) -> StorageResult<Vec<Budget>> {
        let (order, cmp) = order_sql(scan.order);

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM budgets", BUDGET_COLUMNS));
        push_filter(&mut qb, filter);
        if let Some(bound) = scan.bound {
            qb.push(format!(" AND (created_at, id) {} (", cmp))
                .push_bind(bound.created_at)
                .push(", ")
                .push_bind(bound.id.as_uuid())
                .push(")");
        }
        qb.push(format!(" ORDER BY created_at {}, id {}", order, order));
        push_limit(&mut qb, scan.limit)?;

        let rows: Vec<BudgetRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        rows.into_iter().map(BudgetRow::into_budget).collect()
    }

    async fn count(&self, filter: &YearFilter) -> StorageResult<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM budgets");
        push_filter(&mut qb, filter);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(query_err)?;

        count_from_row(count)
    }
}

/// Database row representation for Budget.
#[derive(sqlx::FromRow)]
struct BudgetRow {
    id: Uuid,
    owner_id: Uuid,
    category_id: Uuid,
    year: i32,
    month: i32,
    value: i64,
    created_at: DateTime<Utc>,
}

impl BudgetRow {
    fn into_budget(self) -> StorageResult<Budget> {
        Ok(Budget {
            id: self.id.into(),
            owner_id: self.owner_id.into(),
            category_id: self.category_id.into(),
            year: self.year,
            month: month_from_row(self.month, "budget.month")?,
            value: self.value,
            created_at: self.created_at,
        })
    }
}
