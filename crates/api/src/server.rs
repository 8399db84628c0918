//! HTTP server.

use std::future::Future;
use std::sync::Arc;

use axum::{Router, routing::get};
use tracing::debug;

use tally_core::ports::Repositories;

use crate::params::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageLimits};
use crate::routes::{
    AppState, health_check, list_budgets, list_categories, list_category_rollups,
    list_transactions, monthly_rollups,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Page size when a request omits `count`.
    pub default_page_size: u32,
    /// Upper bound applied to `count`.
    pub max_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl ServerConfig {
    fn page_limits(&self) -> PageLimits {
        PageLimits::new(self.default_page_size, self.max_page_size)
    }
}

/// Build the API router over any repository implementation.
pub fn router<R: Repositories + 'static>(repositories: Arc<R>, config: &ServerConfig) -> Router {
    let repositories: Arc<dyn Repositories> = repositories;
    let state = AppState {
        repositories,
        limits: config.page_limits(),
    };

    Router::new()
        .route("/categories", get(list_categories))
        .route("/transactions", get(list_transactions))
        .route("/budgets", get(list_budgets))
        .route("/rollups/categories", get(list_category_rollups))
        .route("/rollups/months", get(monthly_rollups))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Start the API server with graceful shutdown support.
pub async fn serve_with_shutdown<R, F>(
    repositories: Arc<R>,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    R: Repositories + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(repositories, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    debug!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}
