//! Keyset pagination resolver.
//!
//! Turns a validated [`PaginationQuery`] and an entity filter into one
//! page of any [`KeysetSource`].
//!
//! # Flow
//!
//! 1. Resolve the target cursor to a sort key. A target outside the
//!    filtered set (deleted, or owned by someone else) is dropped and the
//!    query pages from the edge of the set instead.
//! 2. Scan `count + 1` rows past the key in the direction of travel, and
//!    count the filtered set. Both must succeed.
//! 3. Put the window in ascending order and trim the extra row, which is
//!    always the one furthest from the target.
//! 4. Build page info and wrap the rows as edges.

use tracing::{debug, instrument, warn};

use crate::error::DomainResult;
use crate::metrics::{QueryTimer, record_cursor_miss, record_pagination_request};
use crate::ports::{
    Direction, KeysetScan, KeysetSource, PaginationQuery, PaginationResponse, assemble,
    build_page_info,
};

/// Resolve one page of a keyset source.
#[instrument(
    skip_all,
    fields(
        collection = source.collection(),
        direction = query.direction.as_str(),
        count = query.count.get()
    )
)]
pub async fn paginate<S>(
    source: &S,
    filter: &S::Filter,
    query: &PaginationQuery,
) -> DomainResult<PaginationResponse<S::Node>>
where
    S: KeysetSource + ?Sized,
{
    let collection = source.collection();
    let _timer = QueryTimer::new(collection);
    record_pagination_request(collection, query.direction);

    let bound = match query.target {
        Some(target) => {
            let key = source.locate(filter, target).await?;
            if key.is_none() {
                warn!(%target, "Target cursor not in filtered set, paging from the edge");
                record_cursor_miss(collection);
            }
            key
        }
        None => None,
    };
    let target_resolved = bound.is_some();

    let page_size = query.page_size();
    let scan = KeysetScan {
        bound,
        order: query.direction.into(),
        limit: page_size + 1,
    };

    let (mut rows, total_count) = tokio::try_join!(source.scan(filter, scan), source.count(filter))?;

    let over_fetched = rows.len() > page_size;
    match query.direction {
        Direction::Forward => rows.truncate(page_size),
        Direction::Backward => {
            rows.reverse();
            if over_fetched {
                let excess = rows.len() - page_size;
                rows.drain(..excess);
            }
        }
    }

    debug!(
        rows = rows.len(),
        total_count, over_fetched, target_resolved, "Page resolved"
    );

    let page_info = build_page_info(
        &rows,
        over_fetched,
        query.direction,
        target_resolved,
        total_count,
    );

    Ok(assemble(rows, page_info))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::error::{DomainError, StorageError, StorageResult};
    use crate::models::{Category, Identifier, Transaction};
    use crate::ports::{
        CategoryFilter, CategorySelection, InsertionKey, OrderDirection, SubjectFilter,
        TransactionFilter,
    };

    /// In-memory category listing ordered by identifier.
    struct MemoryCategories {
        rows: Vec<Category>,
        fail_count: bool,
        scans: AtomicUsize,
    }

    impl MemoryCategories {
        fn new(rows: Vec<Category>) -> Self {
            Self {
                rows,
                fail_count: false,
                scans: AtomicUsize::new(0),
            }
        }

        fn matching<'a>(&'a self, filter: &'a CategoryFilter) -> impl Iterator<Item = &'a Category> {
            self.rows.iter().filter(move |c| {
                c.owner_id == filter.owner_id
                    && filter
                        .search
                        .as_ref()
                        .is_none_or(|s| c.name.to_lowercase().contains(&s.to_lowercase()))
                    && filter.is_meta.is_none_or(|m| c.is_meta == m)
            })
        }
    }

    #[async_trait]
    impl KeysetSource for MemoryCategories {
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
            Ok(self.matching(filter).find(|c| c.id == id).map(|c| c.id))
        }

        async fn scan(
            &self,
            filter: &CategoryFilter,
            scan: KeysetScan<Identifier>,
        ) -> StorageResult<Vec<Category>> {
            self.scans.fetch_add(1, Ordering::SeqCst);

            let mut rows: Vec<Category> = self
                .matching(filter)
                .filter(|c| match (scan.bound, scan.order) {
                    (None, _) => true,
                    (Some(bound), OrderDirection::Asc) => c.id > bound,
                    (Some(bound), OrderDirection::Desc) => c.id < bound,
                })
                .cloned()
                .collect();

            rows.sort_by_key(|c| c.id);
            if scan.order == OrderDirection::Desc {
                rows.reverse();
            }
            rows.truncate(scan.limit);
            Ok(rows)
        }

        async fn count(&self, filter: &CategoryFilter) -> StorageResult<u64> {
            if self.fail_count {
                return Err(StorageError::QueryError("connection reset".into()));
            }
            Ok(self.matching(filter).count() as u64)
        }
    }

    fn owner(n: u128) -> Identifier {
        Uuid::from_u128(0xffff_0000 + n).into()
    }

    /// The seven categories `AX..G`, with ids increasing in insertion order.
    fn fixture() -> MemoryCategories {
        let names = ["AX", "BX", "CX", "DX", "EX", "FX", "G"];
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut rows: Vec<Category> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Category {
                id: Uuid::from_u128(i as u128 + 1).into(),
                owner_id: owner(1),
                name: name.to_string(),
                is_meta: i % 2 == 0,
                created_at,
            })
            .collect();

        rows.push(Category {
            id: Uuid::from_u128(100).into(),
            owner_id: owner(2),
            name: "HX".into(),
            is_meta: false,
            created_at,
        });

        MemoryCategories::new(rows)
    }

    fn filter() -> CategoryFilter {
        CategoryFilter {
            owner_id: owner(1),
            search: None,
            is_meta: None,
        }
    }

    fn query(direction: Direction, count: i64, target: Option<Identifier>) -> PaginationQuery {
        PaginationQuery::new(direction, count, target).unwrap()
    }

    fn names(response: &PaginationResponse<Category>) -> Vec<&str> {
        response.nodes().map(|c| c.name.as_str()).collect()
    }

    fn id_of(source: &MemoryCategories, name: &str) -> Identifier {
        source.rows.iter().find(|c| c.name == name).unwrap().id
    }

    #[tokio::test]
    async fn first_forward_page() {
        let source = fixture();
        let page = paginate(&source, &filter(), &query(Direction::Forward, 3, None))
            .await
            .unwrap();

        assert_eq!(names(&page), ["AX", "BX", "CX"]);
        assert!(!page.page_info.has_previous_page);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.total_count, 7);
    }

    #[tokio::test]
    async fn forward_page_after_target() {
        let source = fixture();
        let target = id_of(&source, "CX");
        let page = paginate(&source, &filter(), &query(Direction::Forward, 3, Some(target)))
            .await
            .unwrap();

        assert_eq!(names(&page), ["DX", "EX", "FX"]);
        assert!(page.page_info.has_previous_page);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.total_count, 7);
    }

    #[tokio::test]
    async fn backward_without_target_returns_last_page() {
        let source = fixture();
        let page = paginate(&source, &filter(), &query(Direction::Backward, 3, None))
            .await
            .unwrap();

        assert_eq!(names(&page), ["EX", "FX", "G"]);
        assert!(page.page_info.has_previous_page);
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn backward_keeps_rows_closest_to_target() {
        let source = fixture();
        let target = id_of(&source, "G");
        let page = paginate(&source, &filter(), &query(Direction::Backward, 2, Some(target)))
            .await
            .unwrap();

        assert_eq!(names(&page), ["EX", "FX"]);
        assert!(page.page_info.has_previous_page);
        assert!(page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn last_forward_page_has_no_next() {
        let source = fixture();
        let target = id_of(&source, "FX");
        let page = paginate(&source, &filter(), &query(Direction::Forward, 3, Some(target)))
            .await
            .unwrap();

        assert_eq!(names(&page), ["G"]);
        assert!(page.page_info.has_previous_page);
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn search_filter_narrows_set_and_total() {
        let source = fixture();
        let filter = CategoryFilter {
            search: Some("x".into()),
            ..filter()
        };
        let page = paginate(&source, &filter, &query(Direction::Forward, 10, None))
            .await
            .unwrap();

        assert_eq!(names(&page), ["AX", "BX", "CX", "DX", "EX", "FX"]);
        assert_eq!(page.page_info.total_count, 6);
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn meta_flag_filter_composes_with_search() {
        let source = fixture();
        let filter = CategoryFilter {
            search: Some("X".into()),
            is_meta: Some(true),
            ..filter()
        };
        let page = paginate(&source, &filter, &query(Direction::Forward, 10, None))
            .await
            .unwrap();

        assert_eq!(names(&page), ["AX", "CX", "EX"]);
        assert_eq!(page.page_info.total_count, 3);
    }

    #[tokio::test]
    async fn foreign_target_falls_back_to_edge_pages() {
        let source = fixture();
        let foreign = id_of(&source, "HX");

        let forward = paginate(&source, &filter(), &query(Direction::Forward, 3, Some(foreign)))
            .await
            .unwrap();
        assert_eq!(names(&forward), ["AX", "BX", "CX"]);
        assert!(!forward.page_info.has_previous_page);

        let backward = paginate(&source, &filter(), &query(Direction::Backward, 3, Some(foreign)))
            .await
            .unwrap();
        assert_eq!(names(&backward), ["EX", "FX", "G"]);
        assert!(!backward.page_info.has_next_page);
    }

    #[tokio::test]
    async fn deleted_target_behaves_as_absent() {
        let source = fixture();
        let missing: Identifier = Uuid::from_u128(4242).into();
        let page = paginate(&source, &filter(), &query(Direction::Forward, 2, Some(missing)))
            .await
            .unwrap();

        assert_eq!(names(&page), ["AX", "BX"]);
        assert!(!page.page_info.has_previous_page);
        assert!(page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn empty_set_yields_empty_page() {
        let source = fixture();
        let filter = CategoryFilter {
            owner_id: owner(9),
            ..filter()
        };
        let page = paginate(&source, &filter, &query(Direction::Backward, 3, None))
            .await
            .unwrap();

        assert!(page.edges.is_empty());
        assert_eq!(page.page_info.start_cursor, None);
        assert_eq!(page.page_info.end_cursor, None);
        assert!(!page.page_info.has_previous_page);
        assert!(!page.page_info.has_next_page);
        assert_eq!(page.page_info.total_count, 0);
    }

    #[tokio::test]
    async fn pages_respect_count_and_cursor_consistency() {
        let source = fixture();
        for direction in [Direction::Forward, Direction::Backward] {
            for count in 1..=8 {
                let page = paginate(&source, &filter(), &query(direction, count, None))
                    .await
                    .unwrap();

                assert!(page.edges.len() <= count as usize);
                let first = page.edges.first().unwrap();
                let last = page.edges.last().unwrap();
                assert_eq!(Some(first.cursor), page.page_info.start_cursor);
                assert_eq!(Some(last.cursor), page.page_info.end_cursor);
                assert!(page.edges.windows(2).all(|w| w[0].cursor < w[1].cursor));
            }
        }
    }

    #[tokio::test]
    async fn refetch_is_idempotent() {
        let source = fixture();
        let target = id_of(&source, "BX");
        let q = query(Direction::Forward, 2, Some(target));

        let once = paginate(&source, &filter(), &q).await.unwrap();
        let twice = paginate(&source, &filter(), &q).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn forward_then_backward_returns_to_start() {
        let source = fixture();
        let count = NonZeroU32::new(3).unwrap();
        let page_one = paginate(&source, &filter(), &PaginationQuery::first(count))
            .await
            .unwrap();

        let page_two = paginate(
            &source,
            &filter(),
            &query(Direction::Forward, 3, page_one.page_info.end_cursor),
        )
        .await
        .unwrap();

        let back = paginate(
            &source,
            &filter(),
            &query(Direction::Backward, 3, page_two.page_info.start_cursor),
        )
        .await
        .unwrap();

        assert_eq!(back.edges, page_one.edges);
        assert!(!back.page_info.has_previous_page);
        assert!(back.page_info.has_next_page);
    }

    #[tokio::test]
    async fn count_failure_aborts_the_page() {
        let mut source = fixture();
        source.fail_count = true;

        let err = paginate(&source, &filter(), &query(Direction::Forward, 3, None))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Storage(StorageError::QueryError(_))));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn works_through_a_trait_object() {
        let source = fixture();
        let dyn_source: &crate::ports::CategorySource = &source;

        let page = paginate(dyn_source, &filter(), &query(Direction::Forward, 1, None))
            .await
            .unwrap();

        assert_eq!(names(&page), ["AX"]);
        assert_eq!(source.scans.load(Ordering::SeqCst), 1);
    }

    /// In-memory transaction listing ordered by `(created_at, id)`.
    struct MemoryTransactions {
        rows: Vec<Transaction>,
    }

    impl MemoryTransactions {
        fn matching<'a>(
            &'a self,
            filter: &'a TransactionFilter,
        ) -> impl Iterator<Item = &'a Transaction> {
            self.rows.iter().filter(move |t| {
                let subject = match &filter.subject {
                    SubjectFilter::All => true,
                    SubjectFilter::Search(s) => {
                        t.description.to_lowercase().contains(&s.to_lowercase())
                    }
                    SubjectFilter::ValueRange { min, max } => (*min..=*max).contains(&t.value),
                };
                let category = match &filter.categories {
                    CategorySelection::All => true,
                    CategorySelection::Uncategorized => t.category_id.is_none(),
                    CategorySelection::Only(ids) => {
                        t.category_id.is_some_and(|id| ids.contains(&id))
                    }
                };

                t.owner_id == filter.owner_id
                    && subject
                    && category
                    && filter.date_from.is_none_or(|from| t.date >= from)
                    && filter.date_to.is_none_or(|to| t.date <= to)
            })
        }
    }

    fn insertion_key(t: &Transaction) -> InsertionKey {
        InsertionKey {
            created_at: t.created_at,
            id: t.id,
        }
    }

    #[async_trait]
    impl KeysetSource for MemoryTransactions {
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
            Ok(self.matching(filter).find(|t| t.id == id).map(insertion_key))
        }

        async fn scan(
            &self,
            filter: &TransactionFilter,
            scan: KeysetScan<InsertionKey>,
        ) -> StorageResult<Vec<Transaction>> {
            let mut rows: Vec<Transaction> = self
                .matching(filter)
                .filter(|t| match (scan.bound, scan.order) {
                    (None, _) => true,
                    (Some(bound), OrderDirection::Asc) => insertion_key(t) > bound,
                    (Some(bound), OrderDirection::Desc) => insertion_key(t) < bound,
                })
                .cloned()
                .collect();

            rows.sort_by_key(insertion_key);
            if scan.order == OrderDirection::Desc {
                rows.reverse();
            }
            rows.truncate(scan.limit);
            Ok(rows)
        }

        async fn count(&self, filter: &TransactionFilter) -> StorageResult<u64> {
            Ok(self.matching(filter).count() as u64)
        }
    }

    fn tx_id(n: u128) -> Identifier {
        Uuid::from_u128(n).into()
    }

    fn category(n: u128) -> Option<Identifier> {
        Some(Uuid::from_u128(0xc000 + n).into())
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, minute, 0).unwrap()
    }

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    /// Four of the owner's rows share one `created_at`, with ids out of
    /// insertion order. Listing order is `50, 10, 20, 30, 40, 5`.
    fn transactions() -> MemoryTransactions {
        let row = |id, owner_id, created_at, category_id, description: &str, value, date| {
            Transaction {
                id: tx_id(id),
                owner_id,
                category_id,
                description: description.into(),
                value,
                date,
                created_at,
            }
        };

        MemoryTransactions {
            rows: vec![
                row(30, owner(1), at(5), None, "Coffee", -350, day(1, 10)),
                row(50, owner(1), at(0), category(1), "Rent", -120000, day(1, 5)),
                row(40, owner(1), at(5), category(1), "Cinema", -1800, day(1, 25)),
                row(10, owner(1), at(5), category(2), "Groceries", -5420, day(1, 15)),
                row(5, owner(1), at(10), None, "Coffee", -400, day(2, 1)),
                row(20, owner(1), at(5), None, "Coffee beans", -1299, day(1, 20)),
                row(99, owner(2), at(5), None, "Coffee", -350, day(1, 10)),
            ],
        }
    }

    fn transaction_filter() -> TransactionFilter {
        TransactionFilter {
            owner_id: owner(1),
            subject: SubjectFilter::All,
            categories: CategorySelection::All,
            date_from: None,
            date_to: None,
        }
    }

    fn ids(page: &PaginationResponse<Transaction>) -> Vec<Identifier> {
        page.nodes().map(|t| t.id).collect()
    }

    async fn walk_forward(
        source: &MemoryTransactions,
        filter: &TransactionFilter,
        count: i64,
    ) -> Vec<Identifier> {
        let mut seen = Vec::new();
        let mut target = None;
        for _ in 0..10 {
            let page = paginate(source, filter, &query(Direction::Forward, count, target))
                .await
                .unwrap();
            seen.extend(ids(&page));
            if !page.page_info.has_next_page {
                return seen;
            }
            target = page.page_info.end_cursor;
        }
        panic!("forward walk did not terminate");
    }

    async fn walk_backward(
        source: &MemoryTransactions,
        filter: &TransactionFilter,
        count: i64,
    ) -> Vec<Identifier> {
        let mut seen = Vec::new();
        let mut target = None;
        for _ in 0..10 {
            let page = paginate(source, filter, &query(Direction::Backward, count, target))
                .await
                .unwrap();
            let mut chunk = ids(&page);
            chunk.append(&mut seen);
            seen = chunk;
            if !page.page_info.has_previous_page {
                return seen;
            }
            target = page.page_info.start_cursor;
        }
        panic!("backward walk did not terminate");
    }

    #[tokio::test]
    async fn insertion_ties_are_broken_by_id() {
        let source = transactions();
        let expected: Vec<Identifier> = [50, 10, 20, 30, 40, 5].into_iter().map(tx_id).collect();

        for count in 1..=4 {
            assert_eq!(
                walk_forward(&source, &transaction_filter(), count).await,
                expected,
                "forward walk with count {count}"
            );
            assert_eq!(
                walk_backward(&source, &transaction_filter(), count).await,
                expected,
                "backward walk with count {count}"
            );
        }
    }

    #[tokio::test]
    async fn paging_back_from_inside_a_tie() {
        let source = transactions();
        let page = paginate(
            &source,
            &transaction_filter(),
            &query(Direction::Backward, 2, Some(tx_id(30))),
        )
        .await
        .unwrap();

        assert_eq!(ids(&page), [tx_id(10), tx_id(20)]);
        assert!(page.page_info.has_previous_page);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.total_count, 6);
    }

    #[tokio::test]
    async fn uncategorized_within_inclusive_dates() {
        let source = transactions();
        let filter = TransactionFilter {
            categories: CategorySelection::Uncategorized,
            date_from: Some(day(1, 10)),
            date_to: Some(day(1, 20)),
            ..transaction_filter()
        };

        let page = paginate(&source, &filter, &query(Direction::Forward, 10, None))
            .await
            .unwrap();

        assert_eq!(ids(&page), [tx_id(20), tx_id(30)]);
        assert_eq!(page.page_info.total_count, 2);
    }

    #[tokio::test]
    async fn category_set_composes_with_dates_and_subject() {
        let source = transactions();
        let categories = CategorySelection::Only(vec![
            category(1).unwrap(),
            category(2).unwrap(),
        ]);

        let in_january = TransactionFilter {
            categories: categories.clone(),
            date_from: Some(day(1, 5)),
            date_to: Some(day(1, 15)),
            ..transaction_filter()
        };
        let page = paginate(&source, &in_january, &query(Direction::Forward, 10, None))
            .await
            .unwrap();
        assert_eq!(ids(&page), [tx_id(50), tx_id(10)]);

        let mid_range = TransactionFilter {
            subject: SubjectFilter::ValueRange {
                min: -2000,
                max: -1000,
            },
            categories,
            ..transaction_filter()
        };
        let page = paginate(&source, &mid_range, &query(Direction::Forward, 10, None))
            .await
            .unwrap();
        assert_eq!(ids(&page), [tx_id(40)]);
        assert_eq!(page.page_info.total_count, 1);

        let coffee = TransactionFilter {
            subject: SubjectFilter::Search("coffee".into()),
            categories: CategorySelection::Uncategorized,
            date_from: Some(day(1, 15)),
            ..transaction_filter()
        };
        assert_eq!(
            walk_backward(&source, &coffee, 1).await,
            [tx_id(20), tx_id(5)]
        );
    }
}
