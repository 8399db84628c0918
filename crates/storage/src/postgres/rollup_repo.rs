//! Budget versus actuals aggregations for PostgreSQL.
//!
//! The per-category rollup is a keyset listing over the owner's categories,
//! each row carrying its yearly sums. The monthly rollup is a fixed twelve
//! row report and is not paginated.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use tally_core::error::StorageResult;
use tally_core::models::{CategoryRollup, Identifier, MonthlyRollup};
use tally_core::ports::{KeysetScan, KeysetSource, YearFilter};

use super::helpers::{count_from_row, month_from_row, order_sql, push_limit, query_err};

const MONTHLY_ROLLUP_SQL: &str = r#"
    SELECT
        m.month AS month,
        COALESCE((
            SELECT SUM(b.value) FROM budgets b
            WHERE b.owner_id = $1 AND b.year = $2 AND b.month = m.month
        ), 0)::BIGINT AS budgeted,
        COALESCE((
            SELECT SUM(t.value) FROM transactions t
            WHERE t.owner_id = $1
              AND t.date >= make_date($2, m.month, 1)
              AND t.date < make_date($2, m.month, 1) + INTERVAL '1 month'
        ), 0)::BIGINT AS spent
    FROM generate_series(1, 12) AS m(month)
    ORDER BY m.month
"#;

/// PostgreSQL rollup queries.
pub struct PgRollupRepository {
    pool: PgPool,
}

impl PgRollupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Twelve monthly rows for the year, zero-filled.
    #[instrument(skip(self), fields(year = filter.year))]
    pub async fn monthly(&self, filter: YearFilter) -> StorageResult<Vec<MonthlyRollup>> {
        let rows: Vec<MonthlyRollupRow> = sqlx::query_as(MONTHLY_ROLLUP_SQL)
            .bind(filter.owner_id.as_uuid())
            .bind(filter.year)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        rows.into_iter().map(MonthlyRollupRow::into_rollup).collect()
    }
}

/// The rolled-up set is every category of the owner, whatever the year.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &YearFilter) {
    qb.push(" WHERE c.owner_id = ")
        .push_bind(filter.owner_id.as_uuid());
}

/// Select list with the yearly budget and transaction sums of `c`.
fn push_rollup_select(qb: &mut QueryBuilder<'_, Postgres>, filter: &YearFilter) {
    qb.push(
        "SELECT c.id, c.name, COALESCE((SELECT SUM(b.value) FROM budgets b \
         WHERE b.category_id = c.id AND b.year = ",
    )
    .push_bind(filter.year)
    .push(
        "), 0)::BIGINT AS budgeted, COALESCE((SELECT SUM(t.value) FROM transactions t \
         WHERE t.category_id = c.id AND t.date >= make_date(",
    )
    .push_bind(filter.year)
    .push(", 1, 1) AND t.date < make_date(")
    .push_bind(filter.year)
    .push(", 1, 1) + INTERVAL '1 year'), 0)::BIGINT AS spent FROM categories c");
}

#[async_trait]
impl KeysetSource for PgRollupRepository {
    type Node = CategoryRollup;
    type Key = Identifier;
    type Filter = YearFilter;

    fn collection(&self) -> &'static str {
        "category_rollups"
    }

    async fn locate(&self, filter: &YearFilter, id: Identifier) -> StorageResult<Option<Identifier>> {
        let mut qb = QueryBuilder::new("SELECT c.id FROM categories c");
        push_filter(&mut qb, filter);
        qb.push(" AND c.id = ").push_bind(id.as_uuid());

        let row: Option<(Uuid,)> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err)?;

        Ok(row.map(|(id,)| Identifier::from(id)))
    }

    async fn scan(
        &self,
        filter: &YearFilter,
        scan: KeysetScan<Identifier>,
    ) -> StorageResult<Vec<CategoryRollup>> {
        let (order, cmp) = order_sql(scan.order);

        let mut qb = QueryBuilder::new("");
        push_rollup_select(&mut qb, filter);
        push_filter(&mut qb, filter);
        if let Some(bound) = scan.bound {
            qb.push(format!(" AND c.id {} ", cmp))
                .push_bind(bound.as_uuid());
        }
        qb.push(format!(" ORDER BY c.id {}", order));
        push_limit(&mut qb, scan.limit)?;

        let rows: Vec<CategoryRollupRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        Ok(rows.into_iter().map(CategoryRollup::from).collect())
    }

    async fn count(&self, filter: &YearFilter) -> StorageResult<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM categories c");
        push_filter(&mut qb, filter);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(query_err)?;

        count_from_row(count)
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRollupRow {
    id: Uuid,
    name: String,
    budgeted: i64,
    spent: i64,
}

impl From<CategoryRollupRow> for CategoryRollup {
    fn from(row: CategoryRollupRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            budgeted: row.budgeted,
            spent: row.spent,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MonthlyRollupRow {
    month: i32,
    budgeted: i64,
    spent: i64,
}

impl MonthlyRollupRow {
    fn into_rollup(self) -> StorageResult<MonthlyRollup> {
        Ok(MonthlyRollup {
            month: month_from_row(self.month, "rollup.month")?,
            budgeted: self.budgeted,
            spent: self.spent,
        })
    }
}
