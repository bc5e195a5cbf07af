//! Event repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use beacon_core::error::{AppError, ErrorKind};
use beacon_core::event::Event;
use beacon_core::result::AppResult;
use beacon_core::traits::store::EventStore;

/// Repository persisting received events.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn insert(&self, event: &Event) -> AppResult<()> {
        let metadata = event
            .metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            "INSERT INTO events (publisher_id, content, occurred_at, metadata) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&event.publisher_id)
        .bind(&event.content)
        .bind(event.timestamp)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert event", e)
        })?;

        Ok(())
    }
}
