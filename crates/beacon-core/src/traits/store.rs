//! Storage collaborator contract.

use async_trait::async_trait;

use crate::event::Event;
use crate::result::AppResult;

/// Persists received events.
///
/// Used only by the bridge subscriber path. A failed insert must not stop
/// the event stream; the subscriber logs the error and keeps going.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a single event.
    async fn insert(&self, event: &Event) -> AppResult<()>;
}
