//! Listing and rollup handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use tally_core::ports::{PaginationResponse, Repositories};
use tally_core::services::paginate;

use crate::dto::{
    BudgetNode, CategoryNode, CategoryRollupNode, MonthlyReport, MonthlyRollupNode,
    TransactionNode,
};
use crate::error::ApiError;
use crate::extract::{Owner, Params};
use crate::params::{CategoryParams, PageLimits, PageParams, TransactionParams, YearParams};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub repositories: Arc<dyn Repositories>,
    pub limits: PageLimits,
}

type Page<T> = Result<Json<PaginationResponse<T>>, ApiError>;

#[instrument(skip_all, fields(owner = %owner))]
pub async fn list_categories(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Params(page): Params<PageParams>,
    Params(params): Params<CategoryParams>,
) -> Page<CategoryNode> {
    let query = page.to_query(state.limits)?;
    let filter = params.into_filter(owner)?;

    let page = paginate(state.repositories.categories(), &filter, &query).await?;
    Ok(Json(page.map_nodes(CategoryNode::from)))
}

#[instrument(skip_all, fields(owner = %owner))]
pub async fn list_transactions(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Params(page): Params<PageParams>,
    Params(params): Params<TransactionParams>,
) -> Page<TransactionNode> {
    let query = page.to_query(state.limits)?;
    let filter = params.into_filter(owner)?;

    let page = paginate(state.repositories.transactions(), &filter, &query).await?;
    Ok(Json(page.map_nodes(TransactionNode::from)))
}

#[instrument(skip_all, fields(owner = %owner))]
pub async fn list_budgets(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Params(page): Params<PageParams>,
    Params(params): Params<YearParams>,
) -> Page<BudgetNode> {
    let query = page.to_query(state.limits)?;
    let filter = params.into_filter(owner)?;

    let page = paginate(state.repositories.budgets(), &filter, &query).await?;
    Ok(Json(page.map_nodes(BudgetNode::from)))
}

#[instrument(skip_all, fields(owner = %owner))]
pub async fn list_category_rollups(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Params(page): Params<PageParams>,
    Params(params): Params<YearParams>,
) -> Page<CategoryRollupNode> {
    let query = page.to_query(state.limits)?;
    let filter = params.into_filter(owner)?;

    let page = paginate(state.repositories.category_rollups(), &filter, &query).await?;
    Ok(Json(page.map_nodes(CategoryRollupNode::from)))
}

#[instrument(skip_all, fields(owner = %owner))]
pub async fn monthly_rollups(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Params(params): Params<YearParams>,
) -> Result<Json<MonthlyReport>, ApiError> {
    let filter = params.into_filter(owner)?;

    let months = state.repositories.monthly_rollups(filter).await?;
    Ok(Json(MonthlyReport {
        year: filter.year,
        months: months.into_iter().map(MonthlyRollupNode::from).collect(),
    }))
}

/// Health check endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use std::marker::PhantomData;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use uuid::Uuid;

    use tally_core::error::{StorageError, StorageResult};
    use tally_core::models::{
        Budget, Category, CategoryRollup, Identified, Identifier, MonthlyRollup, Transaction,
    };
    use tally_core::ports::{
        BudgetSource, CategoryFilter, CategoryRollupSource, CategorySource, InsertionKey,
        KeysetScan, KeysetSource, TransactionFilter, TransactionSource, YearFilter,
    };

    use super::*;

    /// A source whose filtered set is always empty.
    struct Empty<N, K, F>(PhantomData<fn() -> (N, K, F)>);

    impl<N, K, F> Empty<N, K, F> {
        fn new() -> Self {
            Self(PhantomData)
        }
    }

    #[async_trait]
    impl<N, K, F> KeysetSource for Empty<N, K, F>
    where
        N: Identified + Send + 'static,
        K: Clone + Send + Sync + 'static,
        F: Send + Sync + 'static,
    {
        type Node = N;
        type Key = K;
        type Filter = F;

        fn collection(&self) -> &'static str {
            "empty"
        }

        async fn locate(&self, _filter: &F, _id: Identifier) -> StorageResult<Option<K>> {
            Ok(None)
        }

        async fn scan(&self, _filter: &F, _scan: KeysetScan<K>) -> StorageResult<Vec<N>> {
            Ok(Vec::new())
        }

        async fn count(&self, _filter: &F) -> StorageResult<u64> {
            Ok(0)
        }
    }

    struct EmptyRepositories {
        categories: Empty<Category, Identifier, CategoryFilter>,
        transactions: Empty<Transaction, InsertionKey, TransactionFilter>,
        budgets: Empty<Budget, InsertionKey, YearFilter>,
        rollups: Empty<CategoryRollup, Identifier, YearFilter>,
    }

    #[async_trait]
    impl Repositories for EmptyRepositories {
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

        async fn monthly_rollups(&self, _filter: YearFilter) -> StorageResult<Vec<MonthlyRollup>> {
            Err(StorageError::ConnectionError("pool timed out".into()))
        }
    }

    fn state() -> AppState {
        AppState {
            repositories: Arc::new(EmptyRepositories {
                categories: Empty::new(),
                transactions: Empty::new(),
                budgets: Empty::new(),
                rollups: Empty::new(),
            }),
            limits: PageLimits::default(),
        }
    }

    fn owner() -> Owner {
        Owner(Uuid::from_u128(1).into())
    }

    #[tokio::test]
    async fn empty_listing_has_no_cursors() {
        let Json(page) = list_categories(
            State(state()),
            owner(),
            Params(PageParams::default()),
            Params(CategoryParams::default()),
        )
        .await
        .unwrap();

        assert!(page.edges.is_empty());
        assert_eq!(page.page_info.total_count, 0);
        assert_eq!(page.page_info.start_cursor, None);
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn invalid_filters_are_rejected_with_bad_request() {
        let params = TransactionParams {
            subject: Some("value".into()),
            min: Some("abc".into()),
            max: Some("1".into()),
            ..Default::default()
        };

        let err = list_transactions(
            State(state()),
            owner(),
            Params(PageParams::default()),
            Params(params),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_query");
    }

    #[tokio::test]
    async fn budgets_require_a_year() {
        let err = list_budgets(
            State(state()),
            owner(),
            Params(PageParams::default()),
            Params(YearParams::default()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_failures_become_server_errors() {
        let err = monthly_rollups(
            State(state()),
            owner(),
            Params(YearParams {
                year: Some("2024".into()),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
