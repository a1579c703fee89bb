//! Taskforge Server - Main entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use taskforge_core::{
    api::{self, AppState},
    auth::{CredentialStore, TokenService},
    authz::MutationGuard,
    config::Config,
    db::Database,
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    observability::init("taskforge-server", &config.observability)?;
    observability::metrics::register_metrics();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Taskforge Server"
    );

    // Prometheus recorder backing /metrics
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {e}"))?;

    // Connect to database and apply migrations
    let db = Database::new(&config.database).await?;
    db.migrate().await?;
    tracing::info!("Connected to database, migrations applied");

    let tokens = Arc::new(TokenService::new(&config.auth));
    let credentials = CredentialStore::new(db.pool().clone());
    let guard = MutationGuard::new(db.clone(), config.database.fact_timeout);

    let app_state = AppState {
        db,
        tokens,
        credentials,
        guard,
        storage: config.storage.clone(),
        metrics: Some(metrics_handle),
    };

    let app = api::build_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    observability::shutdown();
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
    // Give in-flight fact lookups a moment to resolve before teardown.
    tokio::time::sleep(Duration::from_millis(100)).await;
}
