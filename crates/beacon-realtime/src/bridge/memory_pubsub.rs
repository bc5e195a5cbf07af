//! In-memory pub/sub for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::sync::broadcast;

use beacon_core::result::AppResult;

use super::pubsub::{MessageStream, PubSub};

/// In-memory pub/sub implementation backed by tokio broadcast channels.
#[derive(Debug)]
pub struct MemoryPubSub {
    /// Channel name → broadcast sender.
    channels: RwLock<HashMap<String, broadcast::Sender<Bytes>>>,
    /// Buffer size for broadcast channels.
    buffer_size: usize,
}

impl MemoryPubSub {
    /// Create a new in-memory pub/sub.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size,
        }
    }
}

#[async_trait]
impl PubSub for MemoryPubSub {
    async fn publish(&self, channel: &str, payload: Bytes) -> AppResult<()> {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(channel) {
            // No subscribers is not an error; the message is simply lost,
            // matching the broker's at-most-once semantics.
            let _ = tx.send(payload);
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> AppResult<MessageStream> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0);
        let rx = tx.subscribe();

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let pubsub = MemoryPubSub::new(16);

        let mut a = pubsub.subscribe("events").await.unwrap();
        let mut b = pubsub.subscribe("events").await.unwrap();

        pubsub
            .publish("events", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert_eq!(a.next().await.unwrap(), Bytes::from_static(b"x"));
        assert_eq!(b.next().await.unwrap(), Bytes::from_static(b"x"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_lost() {
        let pubsub = MemoryPubSub::new(16);

        pubsub
            .publish("events", Bytes::from_static(b"dropped"))
            .await
            .unwrap();

        let mut rx = pubsub.subscribe("events").await.unwrap();
        pubsub
            .publish("events", Bytes::from_static(b"seen"))
            .await
            .unwrap();

        assert_eq!(rx.next().await.unwrap(), Bytes::from_static(b"seen"));
    }
}
