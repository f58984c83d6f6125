//! StaffHub Server — real-time notification core for the HR onboarding
//! platform.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use staffhub_core::config::AppConfig;
use staffhub_core::error::AppError;
use staffhub_database::{NotificationStore, StaffDirectory};

#[tokio::main]
async fn main() {
    let env = std::env::var("STAFFHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting StaffHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Store and directory backends ─────────────────────
    let (store, directory): (Arc<dyn NotificationStore>, Arc<dyn StaffDirectory>) =
        if config.database.url.is_empty() {
            tracing::info!("No database configured, using in-memory store");
            (
                Arc::new(staffhub_database::memory::MemoryNotificationStore::new()),
                Arc::new(staffhub_database::memory::MemoryDirectory::new()),
            )
        } else {
            tracing::info!("Connecting to database...");
            let pool = staffhub_database::connection::create_pool(&config.database).await?;
            staffhub_database::migration::run_migrations(&pool).await?;
            (
                Arc::new(staffhub_database::postgres::PgNotificationStore::new(
                    pool.clone(),
                )),
                Arc::new(staffhub_database::postgres::PgDirectory::new(pool)),
            )
        };

    // ── Step 2: Auth and access cache ────────────────────────────
    let verifier = Arc::new(staffhub_auth::jwt::verifier::TokenVerifier::new(
        &config.auth,
    ));
    let access = Arc::new(staffhub_auth::access::cache::AccessCache::new(
        Arc::clone(&directory),
        &config.access,
    ));

    // ── Step 3: Real-time engine ─────────────────────────────────
    let metrics = Arc::new(staffhub_realtime::metrics::EngineMetrics::new());
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let connections = Arc::new(
        staffhub_realtime::connection::manager::ConnectionManager::new(
            config.realtime.clone(),
            Arc::clone(&verifier),
            Arc::clone(&access),
            Arc::clone(&metrics),
        )
        .with_ack_sink(ack_tx),
    );

    // ── Step 4: Notification pipeline ────────────────────────────
    let queue = staffhub_notify::queue::NotificationQueue::new(
        Arc::clone(&store),
        config.notify.clone(),
    );
    let fanout =
        staffhub_notify::fanout::EventFanout::new(Arc::clone(&directory), queue.clone());
    let reader = staffhub_notify::service::NotificationReader::new(Arc::clone(&store));

    let mut dispatcher = staffhub_notify::dispatcher::Dispatcher::new(
        Arc::clone(&store),
        Arc::clone(&directory),
        config.notify.clone(),
    );
    dispatcher.register(Arc::new(staffhub_notify::adapters::InAppAdapter::new(
        Arc::clone(&connections),
        config.notify.in_app_requires_listener,
    )));
    dispatcher.register(Arc::new(staffhub_notify::adapters::EmailAdapter::new(
        config.adapters.email.clone(),
    )));
    dispatcher.register(Arc::new(staffhub_notify::adapters::SmsAdapter::new(
        config.adapters.sms.clone(),
    )));
    dispatcher.register(Arc::new(staffhub_notify::adapters::PushAdapter::new(
        config.adapters.push.clone(),
    )));
    let dispatcher = Arc::new(dispatcher);

    // ── Step 5: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 6: Background tasks ─────────────────────────────────
    let ack_task = tokio::spawn(staffhub_notify::service::run_ack_loop(
        reader.clone(),
        ack_rx,
    ));

    let sweeper_task = tokio::spawn(staffhub_realtime::connection::sweeper::run_sweeper(
        Arc::clone(&connections),
        Arc::clone(&metrics),
        shutdown_rx.clone(),
    ));

    let dispatcher_task = if config.notify.enabled {
        tracing::info!("Starting notification dispatcher...");
        let dispatcher = Arc::clone(&dispatcher);
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            dispatcher.run(cancel).await;
        }))
    } else {
        tracing::info!("Notification dispatcher disabled");
        None
    };

    let scheduler = staffhub_notify::scheduler::CronScheduler::new(
        Arc::clone(&store),
        config.notify.retention_days,
    )
    .await?;
    scheduler.register_default_tasks().await?;
    scheduler.start().await?;

    // ── Step 7: HTTP server ──────────────────────────────────────
    let app_state = staffhub_api::state::AppState {
        verifier,
        access,
        connections,
        metrics,
        fanout,
        reader,
    };
    let app = staffhub_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("StaffHub server listening on {addr}");

    // ── Step 8: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Waiting for background tasks to complete...");
    if let Some(task) = dispatcher_task {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(30), task).await;
    }
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), sweeper_task).await;
    ack_task.abort();

    tracing::info!("StaffHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
