//! Transaction listing for PostgreSQL, ordered by insertion time.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use tally_core::error::StorageResult;
use tally_core::models::{Identifier, Transaction};
use tally_core::ports::{
    CategorySelection, InsertionKey, KeysetScan, KeysetSource, SubjectFilter, TransactionFilter,
};

use super::helpers::{count_from_row, order_sql, push_contains, push_limit, query_err};

const TRANSACTION_COLUMNS: &str = "id, owner_id, category_id, description, value, date, created_at";

/// PostgreSQL transaction listing.
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the filtered-set predicate. Always opens the `WHERE` clause.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    qb.push(" WHERE owner_id = ")
        .push_bind(filter.owner_id.as_uuid());

    match &filter.subject {
        SubjectFilter::All => {}
        SubjectFilter::Search(text) => push_contains(qb, "description", text),
        SubjectFilter::ValueRange { min, max } => {
            qb.push(" AND value BETWEEN ")
                .push_bind(*min)
                .push(" AND ")
                .push_bind(*max);
        }
    }

    match &filter.categories {
        CategorySelection::All => {}
        CategorySelection::Uncategorized => {
            qb.push(" AND category_id IS NULL");
        }
        CategorySelection::Only(ids) => {
            let ids: Vec<Uuid> = ids.iter().map(Identifier::as_uuid).collect();
            qb.push(" AND category_id = ANY(").push_bind(ids).push(")");
        }
    }

    if let Some(from) = filter.date_from {
        qb.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND date <= ").push_bind(to);
    }
}

#[async_trait]
impl KeysetSource for PgTransactionRepository {
    type Node = Transaction;
    type Key = InsertionKey;
    type Filter = TransactionFilter;

    fn collection(&self) -> &'static str {
        "transactions"
    }

    async fn locate(
        &self,
        filter: &TransactionFilter,
        id: Identifier,
    ) -> StorageResult<Option<InsertionKey>> {
        let mut qb = QueryBuilder::new("SELECT created_at, id FROM transactions");
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
        filter: &TransactionFilter,
        scan: KeysetScan<InsertionKey>,
    ) -> StorageResult<Vec<Transaction>> {
        let (order, cmp) = order_sql(scan.order);

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM transactions", TRANSACTION_COLUMNS));
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

        let rows: Vec<TransactionRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    async fn count(&self, filter: &TransactionFilter) -> StorageResult<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM transactions");
        push_filter(&mut qb, filter);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(query_err)?;

        count_from_row(count)
    }
}

/// Database row representation for Transaction.
#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    owner_id: Uuid,
    category_id: Option<Uuid>,
    description: String,
    value: i64,
    date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: row.id.into(),
            owner_id: row.owner_id.into(),
            category_id: row.category_id.map(Identifier::from),
            description: row.description,
            value: row.value,
            date: row.date,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TransactionFilter {
        TransactionFilter {
            owner_id: Identifier::generate(),
            subject: SubjectFilter::All,
            categories: CategorySelection::All,
            date_from: None,
            date_to: None,
        }
    }

    fn sql_for(filter: &TransactionFilter) -> String {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM transactions");
        push_filter(&mut qb, filter);
        qb.into_sql()
    }

    #[test]
    fn value_range_and_dates_are_inclusive() {
        let filter = TransactionFilter {
            subject: SubjectFilter::ValueRange { min: -500, max: 0 },
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..filter()
        };

        assert_eq!(
            sql_for(&filter),
            "SELECT COUNT(*) FROM transactions WHERE owner_id = $1 \
             AND value BETWEEN $2 AND $3 AND date >= $4 AND date <= $5"
        );
    }

    #[test]
    fn category_selection_variants() {
        let uncategorized = TransactionFilter {
            categories: CategorySelection::Uncategorized,
            ..filter()
        };
        assert!(sql_for(&uncategorized).ends_with("AND category_id IS NULL"));

        let only = TransactionFilter {
            subject: SubjectFilter::Search("rent".into()),
            categories: CategorySelection::Only(vec![Identifier::generate()]),
            ..filter()
        };
        assert!(sql_for(&only).ends_with(
            "AND description ILIKE $2 ESCAPE '\\' AND category_id = ANY($3)"
        ));
    }
}
