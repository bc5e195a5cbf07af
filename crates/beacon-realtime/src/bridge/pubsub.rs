//! Pub/sub backend contract.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use beacon_core::result::AppResult;

/// A lazy, unbounded sequence of raw messages from one subscription.
///
/// The stream ends when the underlying broker connection drops; it is not
/// restartable, so the consumer must call [`PubSub::subscribe`] again.
pub type MessageStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// The durable pub/sub broker used for cross-process distribution.
///
/// Subscribers are independent readers of the same channel; the broker is
/// the only cross-process coordination point in the system.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publish a payload on a channel. Returns once the broker accepted
    /// the publish; does not wait for any subscriber.
    async fn publish(&self, channel: &str, payload: Bytes) -> AppResult<()>;

    /// Open a new subscription to a channel.
    async fn subscribe(&self, channel: &str) -> AppResult<MessageStream>;
}
