//! Tally - personal finance tracker read API.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! tally
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/tally HTTP_PORT=8080 tally
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tally_api::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ServerConfig, serve_with_shutdown};
use tally_core::metrics::init_metrics;
use tally_storage::{Database, DatabaseConfig, PgRepositories};

const SERVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Tally CLI - finance tracker read API.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Tally - keyset-paginated read API for personal finances")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/tally")]
    database_url: String,

    /// HTTP bind address.
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    http_host: String,

    /// HTTP server port.
    #[arg(long, env = "HTTP_PORT", default_value = "8080")]
    http_port: u16,

    /// Page size when a request omits `count`.
    #[arg(long, env = "DEFAULT_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    default_page_size: u32,

    /// Largest page a request may ask for.
    #[arg(long, env = "MAX_PAGE_SIZE", default_value_t = MAX_PAGE_SIZE)]
    max_page_size: u32,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = start_metrics_exporter(cli.metrics_port);

    info!("Starting Tally API");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    let db_config = DatabaseConfig::for_api(&cli.database_url);

    info!("Connecting to database...");
    let db = Database::connect(&db_config)
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("Database ready (migrations applied)");

    if cli.migrate_only {
        info!("--migrate-only flag set, exiting");
        db.close().await;
        return Ok(());
    }

    let repositories = Arc::new(PgRepositories::new(&db));

    let server_config = ServerConfig {
        host: cli.http_host.clone(),
        port: cli.http_port,
        default_page_size: cli.default_page_size,
        max_page_size: cli.max_page_size,
    };

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server_handle = tokio::spawn(
        async move {
            let shutdown_signal = async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            };

            if let Err(e) = serve_with_shutdown(repositories, server_config, shutdown_signal).await
            {
                error!(error = %e, "Server error");
            }
            debug!("Server stopped");
        }
        .instrument(info_span!("http")),
    );

    info!("Tally ready");
    info!("   API:      http://{}:{}", cli.http_host, cli.http_port);
    if metrics_enabled {
        info!("   Metrics:  http://localhost:{}/metrics", cli.metrics_port);
    } else {
        info!("   Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    let server_exited = tokio::select! {
        _ = shutdown_signal() => false,
        _ = &mut server_handle => true,
    };

    if server_exited {
        warn!("Server exited before a shutdown was requested");
    } else {
        info!("Shutting down...");
        let _ = shutdown_tx.send(true);

        match tokio::time::timeout(SERVER_SHUTDOWN_TIMEOUT, server_handle).await {
            Ok(_) => debug!("Server drained"),
            Err(_) => warn!("Server shutdown timed out"),
        }
    }

    db.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Install the Prometheus exporter. Returns whether metrics are enabled.
fn start_metrics_exporter(port: u16) -> bool {
    let addr = match format!("0.0.0.0:{}", port).parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address: {}. Continuing without metrics.", e);
            return false;
        }
    };

    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            init_metrics();
            true
        }
        Err(e) => {
            warn!("Failed to start metrics exporter: {}. Continuing without metrics.", e);
            false
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// A handler that cannot be installed never fires, leaving the other one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_masked_in_logs() {
        assert_eq!(
            mask_password("postgres://tally:secret@db:5432/tally"),
            "postgres://tally:****@db:5432/tally"
        );
        assert_eq!(
            mask_password("postgres://localhost/tally"),
            "postgres://localhost/tally"
        );
        assert_eq!(mask_password("not a url"), "not a url");
    }

    #[test]
    fn migrate_only_is_a_flag() {
        let cli = Cli::try_parse_from(["tally", "--migrate-only"]).unwrap();
        assert!(cli.migrate_only);
    }
}
