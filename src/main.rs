//! Nestly notification server.
//!
//! Wires the notification store, realtime engine, rules subscriber,
//! maintenance scheduler and WebSocket gateway together.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use nestly_core::config::{AppConfig, LogFormat, StoreBackend};
use nestly_core::error::AppError;
use nestly_database::store::{GroupDirectory, NotificationStore};
use nestly_database::{
    DatabasePool, MemoryGroupDirectory, MemoryNotificationStore, PgGroupDirectory,
    PgNotificationStore,
};
use nestly_realtime::RealtimeEngine;
use nestly_service::{NotificationRules, NotificationService, NotificationSubscriber};
use nestly_worker::jobs::{RetentionPurgeJob, SnoozeSweepJob};
use nestly_worker::{CronScheduler, JobExecutor};

/// Command-line flags.
#[derive(Debug, Parser)]
#[command(name = "nestly-server", version, about = "Nestly real-time notification server")]
struct Cli {
    /// Environment overlay to load (`config/{env}.toml`)
    #[arg(long, env = "NESTLY_ENV", default_value = "development")]
    env: String,

    /// Directory holding `default.toml` and the environment overlays
    #[arg(long, env = "NESTLY_CONFIG_DIR", default_value = "config")]
    config_dir: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config_dir, &cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `logging.level`.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = fmt().with_env_filter(filter).with_target(true);

    match config.logging.format {
        LogFormat::Json => builder.json().with_thread_ids(true).init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Nestly notifications v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Notification store ───────────────────────────────
    let (db_pool, store, groups): (
        Option<DatabasePool>,
        Arc<dyn NotificationStore>,
        Arc<dyn GroupDirectory>,
    ) = match config.notifications.store {
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = DatabasePool::connect(&config.database).await?;

            tracing::info!("Running database migrations...");
            pool.migrate().await?;

            let store = Arc::new(PgNotificationStore::new(pool.pool().clone()));
            let groups = Arc::new(PgGroupDirectory::new(pool.pool().clone()));
            (Some(pool), store, groups)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory notification store; nothing survives a restart");
            (
                None,
                Arc::new(MemoryNotificationStore::new()),
                Arc::new(MemoryGroupDirectory::new()),
            )
        }
    };

    // ── Step 2: Realtime engine ──────────────────────────────────
    let engine = RealtimeEngine::new(config.realtime.clone());

    // ── Step 3: Notification service + bus subscriber ────────────
    let notification_service = NotificationService::new(
        store,
        Arc::clone(&engine.registry),
        Arc::clone(&engine.bus),
        config.notifications.retention(),
    );

    let subscriber = Arc::new(NotificationSubscriber::new(
        NotificationRules::new(Arc::clone(&groups)),
        notification_service.clone(),
        Arc::clone(&engine.registry),
        config.realtime.live_room_refresh,
    ));
    subscriber.attach(&engine.bus);

    // ── Step 4: Maintenance scheduler ────────────────────────────
    let scheduler = if config.worker.enabled {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(SnoozeSweepJob::new(notification_service.clone())));
        executor.register(Arc::new(RetentionPurgeJob::new(notification_service.clone())));

        let scheduler = CronScheduler::new(Arc::new(executor)).await?;
        scheduler.register_default_tasks(&config.worker).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Maintenance scheduler disabled");
        None
    };

    // ── Step 5: Build and start HTTP server ──────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = config.server.shutdown_grace();

    let app_state = nestly_api::AppState::new(
        Arc::new(config),
        db_pool.clone(),
        groups,
        engine.clone(),
    );
    let app = nestly_api::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Nestly server listening");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            // Closing sessions ends the socket forwarders so the server can drain.
            shutdown_engine.registry.close_all();
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 7: Drain background work ────────────────────────────
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler shutdown failed");
        }
    }

    if tokio::time::timeout(grace, engine.shutdown()).await.is_err() {
        tracing::warn!(
            grace_seconds = grace.as_secs(),
            "In-flight event handlers did not finish before the grace period"
        );
    }

    if let Some(pool) = db_pool {
        pool.close().await;
    }

    tracing::info!("Nestly server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
