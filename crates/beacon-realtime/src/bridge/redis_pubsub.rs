//! Redis pub/sub backend for multi-process deployments.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use tracing::info;

use beacon_core::error::{AppError, ErrorKind};
use beacon_core::result::AppResult;

use super::pubsub::{MessageStream, PubSub};

/// Redis-backed pub/sub.
///
/// Publishing goes through a multiplexed connection manager that reconnects
/// transparently. Each subscription gets its own dedicated connection, as
/// required by the Redis protocol; when that connection drops, the stream
/// ends and the subscriber resubscribes.
pub struct RedisPubSub {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisPubSub {
    /// Connect to Redis at the given URL.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            AppError::with_source(ErrorKind::PubSub, format!("Invalid Redis URL: {e}"), e)
        })?;

        let publisher = ConnectionManager::new(client.clone()).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::PubSub,
                format!("Redis connection failed: {e}"),
                e,
            )
        })?;

        info!("Connected to Redis pub/sub broker");
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, channel: &str, payload: Bytes) -> AppResult<()> {
        let mut conn = self.publisher.clone();
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload.as_ref())
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::PubSub, format!("Redis PUBLISH failed: {e}"), e)
            })?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> AppResult<MessageStream> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::PubSub,
                format!("Redis subscribe connection failed: {e}"),
                e,
            )
        })?;

        pubsub.subscribe(channel).await.map_err(|e| {
            AppError::with_source(ErrorKind::PubSub, format!("Redis SUBSCRIBE failed: {e}"), e)
        })?;

        let stream = pubsub
            .into_on_message()
            .map(|msg| Bytes::from(msg.get_payload_bytes().to_vec()));

        Ok(stream.boxed())
    }
}

impl std::fmt::Debug for RedisPubSub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPubSub").finish()
    }
}
