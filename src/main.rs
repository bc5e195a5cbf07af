//! Beacon Server — real-time event notification service.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use beacon_core::config::AppConfig;
use beacon_core::error::AppError;
use beacon_realtime::bridge::{EventBridge, RedisPubSub};
use beacon_realtime::hub::Hub;

#[tokio::main]
async fn main() {
    let env = std::env::var("BEACON_ENV").unwrap_or_else(|_| "development".to_string());
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
    tracing::info!("Starting Beacon v{}", env!("CARGO_PKG_VERSION"));

    // Database connection + migrations.
    let db = beacon_database::DatabasePool::connect(&config.database).await?;
    beacon_database::migration::run_migrations(db.pool()).await?;

    // Local hub: one per process, lives for the process lifetime.
    let hub = Hub::spawn();

    // Pub/sub bridge shared by all server processes.
    let pubsub = Arc::new(RedisPubSub::connect(&config.pubsub.url).await?);
    let store = Arc::new(beacon_database::EventRepository::new(db.pool().clone()));
    let bridge = Arc::new(EventBridge::new(
        pubsub,
        store,
        hub.clone(),
        config.pubsub.clone(),
    ));

    let shutdown = CancellationToken::new();
    let subscriber = {
        let bridge = Arc::clone(&bridge);
        let token = shutdown.clone();
        tokio::spawn(async move { bridge.run_subscriber(token).await })
    };

    // HTTP server.
    let state = beacon_api::AppState {
        config: Arc::new(config.clone()),
        hub,
        bridge,
        db: db.clone(),
    };
    let app = beacon_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Beacon server listening on {addr}");

    let server_shutdown = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        server_shutdown.cancel();
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // Let the subscriber finish its in-flight persist + broadcast pair.
    let grace = std::time::Duration::from_secs(config.server.shutdown_grace_seconds);
    match tokio::time::timeout(grace, subscriber).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => tracing::warn!("Subscriber task panicked: {e}"),
        Err(_) => tracing::warn!("Subscriber did not stop within the grace period"),
    }

    db.close().await;
    tracing::info!("Beacon server shut down gracefully");
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
