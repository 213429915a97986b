//! Cron service entry point.

use cron_service::config::Config;
use cron_service::crypto::TokenCipher;
use cron_service::observability::metrics::init_metrics_recorder;
use cron_service::routes::{self, AppState};
use cron_service::services::{HttpTargetClient, TargetClient};
use common::secret::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cron_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cron service");

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        run_concurrency = config.run_concurrency,
        run_request_timeout_seconds = config.run_request_timeout_seconds,
        token_ttl_seconds = ?config.token_ttl_seconds,
        "Configuration loaded"
    );

    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            error!(error = %e, "Database connection failed");
            e
        })?;
    info!(max_connections = config.db_max_connections, "Database pool ready");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            e
        })?;
    info!("Migrations applied");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let cipher = Arc::new(TokenCipher::new(config.encryption_key())?);
    let target_client: Arc<dyn TargetClient> = Arc::new(HttpTargetClient::new(Duration::from_secs(
        config.run_request_timeout_seconds,
    ))?);

    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState {
        pool: db_pool.clone(),
        config,
        cipher,
        target_client,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!(bind_address = %bind_address, error = %e, "BIND_ADDRESS is not a socket address");
        e
    })?;

    info!("Cron service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("Cron service shutdown complete");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM, after the `DRAIN_SECONDS` drain period.
async fn shutdown_signal() {
    let received = wait_for_signal().await;
    let drain = drain_period(std::env::var("DRAIN_SECONDS").ok().as_deref());
    info!(
        signal = received,
        drain_secs = drain.as_secs(),
        "Shutdown signal received, draining"
    );

    if !drain.is_zero() {
        tokio::time::sleep(drain).await;
    }
    info!("Drain complete, no longer accepting connections");
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "SIGTERM handler unavailable, listening for SIGINT only");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        received = wait_for_ctrl_c() => received,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "SIGINT handler unavailable");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

/// Drain period from the raw `DRAIN_SECONDS` value, zero when unset or unparsable.
fn drain_period(raw: Option<&str>) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::ZERO)
}
