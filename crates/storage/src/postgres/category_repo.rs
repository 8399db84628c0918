//! Category listing for PostgreSQL, ordered by identifier.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use tally_core::error::StorageResult;
use tally_core::models::{Category, Identifier};
use tally_core::ports::{CategoryFilter, KeysetScan, KeysetSource};

use super::helpers::{count_from_row, order_sql, push_contains, push_limit, query_err};

const CATEGORY_COLUMNS: &str = "id, owner_id, name, is_meta, created_at";

/// PostgreSQL category listing.
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the filtered-set predicate. Always opens the `WHERE` clause.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CategoryFilter) {
    qb.push(" WHERE owner_id = ")
        .push_bind(filter.owner_id.as_uuid());

    if let Some(search) = &filter.search {
        push_contains(qb, "name", search);
    }
    if let Some(is_meta) = filter.is_meta {
        qb.push(" AND is_meta = ").push_bind(is_meta);
    }
}

#[async_trait]
impl KeysetSource for PgCategoryRepository {
    type Node = Category;
    type Key = Identifier;
    type Filter = CategoryFilter;

    fn collection(&self) -> &'static str {
        "categories"
    }

    async fn locate(
        &self,
        filter: &CategoryFilter,
        id: Identifier,
    ) -> StorageResult<Option<Identifier>> {
        let mut qb = QueryBuilder::new("SELECT id FROM categories");
        push_filter(&mut qb, filter);
        qb.push(" AND id = ").push_bind(id.as_uuid());

        let row: Option<(Uuid,)> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err)?;

        Ok(row.map(|(id,)| Identifier::from(id)))
    }

    async fn scan(
        &self,
        filter: &CategoryFilter,
        scan: KeysetScan<Identifier>,
    ) -> StorageResult<Vec<Category>> {
        let (order, cmp) = order_sql(scan.order);

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM categories", CATEGORY_COLUMNS));
        push_filter(&mut qb, filter);
        if let Some(bound) = scan.bound {
            qb.push(format!(" AND id {} ", cmp))
                .push_bind(bound.as_uuid());
        }
        qb.push(format!(" ORDER BY id {}", order));
        push_limit(&mut qb, scan.limit)?;

        let rows: Vec<CategoryRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn count(&self, filter: &CategoryFilter) -> StorageResult<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM categories");
        push_filter(&mut qb, filter);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(query_err)?;

        count_from_row(count)
    }
}

/// Database row representation for Category.
#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    is_meta: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id.into(),
            owner_id: row.owner_id.into(),
            name: row.name,
            is_meta: row.is_meta,
            created_at: row.created_at,
        }
    }
}
