use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use quickpoll_api::app;
use quickpoll_api::config::{Config, StoreBackend};
use quickpoll_api::jobs::{JobScheduler, PoolMetricsJob, ReconcileTalliesJob};
use quickpoll_api::middleware::{init_metrics, logging::init_logging};

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to initialize metrics")?;

    info!("Starting QuickPoll API v{}", env!("CARGO_PKG_VERSION"));

    let pool = match config.store.backend {
        StoreBackend::Postgres => {
            let db_config = persistence::db::DatabaseConfig::from(&config.database);
            let pool = persistence::db::create_pool(&db_config)
                .await
                .context("Failed to connect to database")?;

            info!("Running database migrations...");
            persistence::db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            info!("Migrations completed");

            Some(pool)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            None
        }
    };

    let stores = app::build_stores(pool.as_ref());
    let service = app::build_service(
        &config,
        stores,
        std::sync::Arc::new(domain::services::SystemClock),
    );

    let mut scheduler = JobScheduler::new();
    scheduler.register(ReconcileTalliesJob::new(
        service.tally().clone(),
        config.tally.reconcile_interval_secs,
        config.tally.reconcile_batch_size,
    ));
    if let Some(pool) = &pool {
        scheduler.register(PoolMetricsJob::new(pool.clone()));
    }
    scheduler.start();

    let addr = config.socket_addr().context("Invalid server address")?;
    let router = app::create_app_with_service(config, service, pool);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
