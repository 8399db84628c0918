//! Shared helpers for PostgreSQL query building and row conversion.

use sqlx::{Postgres, QueryBuilder};

use tally_core::error::{StorageError, StorageResult};
use tally_core::ports::OrderDirection;

/// Map a sqlx error to a query error.
pub fn query_err(err: sqlx::Error) -> StorageError {
    StorageError::QueryError(err.to_string())
}

/// SQL keyword and keyset comparison operator for a scan order.
pub fn order_sql(order: OrderDirection) -> (&'static str, &'static str) {
    match order {
        OrderDirection::Asc => ("ASC", ">"),
        OrderDirection::Desc => ("DESC", "<"),
    }
}

/// Escape `ILIKE` wildcards so user text is matched literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append a case-insensitive substring match on `column`.
///
/// The column name is always a literal from this crate, never user input.
pub fn push_contains(qb: &mut QueryBuilder<'_, Postgres>, column: &str, text: &str) {
    qb.push(" AND ")
        .push(column)
        .push(" ILIKE ")
        .push_bind(format!("%{}%", escape_like(text)))
        .push(" ESCAPE '\\'");
}

/// Append `LIMIT` for a scan.
pub fn push_limit(qb: &mut QueryBuilder<'_, Postgres>, limit: usize) -> StorageResult<()> {
    let limit = i64::try_from(limit).map_err(|_| {
        StorageError::QueryError(format!("scan limit {} exceeds BIGINT", limit))
    })?;
    qb.push(" LIMIT ").push_bind(limit);
    Ok(())
}

/// Convert a stored count into the domain's unsigned count.
pub fn count_from_row(count: i64) -> StorageResult<u64> {
    u64::try_from(count).map_err(|_| {
        StorageError::SerializationError(format!("count is negative: {}", count))
    })
}

/// Convert a stored month column into `1..=12`.
pub fn month_from_row(month: i32, field_name: &str) -> StorageResult<u32> {
    u32::try_from(month)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| {
            StorageError::SerializationError(format!(
                "{} out of range: expected 1-12, got {}",
                field_name, month
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("coffee"), "coffee");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\tmp"), "c:\\\\tmp");
    }

    #[test]
    fn contains_clause_binds_escaped_pattern() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM categories WHERE TRUE");
        push_contains(&mut qb, "name", "50%");
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM categories WHERE TRUE AND name ILIKE $1 ESCAPE '\\'"
        );
    }

    #[test]
    fn order_maps_to_keyset_operator() {
        assert_eq!(order_sql(OrderDirection::Asc), ("ASC", ">"));
        assert_eq!(order_sql(OrderDirection::Desc), ("DESC", "<"));
    }

    #[test]
    fn month_conversion_rejects_out_of_range() {
        assert_eq!(month_from_row(12, "budget.month").unwrap(), 12);
        let err = month_from_row(13, "budget.month").unwrap_err().to_string();
        assert!(err.contains("budget.month"));
        assert!(month_from_row(0, "budget.month").is_err());
    }

    #[test]
    fn negative_counts_are_corrupt() {
        assert_eq!(count_from_row(7).unwrap(), 7);
        assert!(count_from_row(-1).is_err());
    }
}
