//! MissionBoard Server
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Installs the Prometheus exporter on the metrics port
//! - Connects to `PostgreSQL` and runs pending migrations
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! # Start PostgreSQL
//! docker compose up -d
//!
//! # Run server
//! cargo run --bin server
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use missionboard::config::{Config, DEFAULT_LOG_FILTER};
use missionboard::metrics::register_business_metrics;
use missionboard::server::{self, AppState};
use missionboard::store::postgres::PostgresStore;
use missionboard_core::environment::SystemClock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MissionBoard server...");

    let metrics_addr: SocketAddr = format!(
        "{}:{}",
        config.server.metrics_host, config.server.metrics_port
    )
    .parse()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;
    register_business_metrics();
    tracing::info!(address = %metrics_addr, "Prometheus metrics available at /metrics");

    let store = PostgresStore::connect(&config.postgres).await?;
    store.migrate().await?;
    tracing::info!("Database connected and migrated");

    let state = AppState::new(Arc::new(store.clone()), Arc::new(SystemClock));
    let app = server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    server::serve(
        listener,
        app,
        Duration::from_secs(config.server.shutdown_timeout),
    )
    .await?;

    store.pool().close().await;
    tracing::info!("Server stopped");
    Ok(())
}
