//! Application state shared across all handlers.

use std::sync::Arc;

use beacon_core::config::AppConfig;
use beacon_database::DatabasePool;
use beacon_realtime::bridge::EventBridge;
use beacon_realtime::hub::HubHandle;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Handle to the local hub's event loop.
    pub hub: HubHandle,
    /// Bridge to the shared pub/sub channel.
    pub bridge: Arc<EventBridge>,
    /// PostgreSQL connection pool.
    pub db: DatabasePool,
}
