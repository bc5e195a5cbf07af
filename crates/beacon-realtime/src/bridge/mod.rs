//! Cross-process event distribution over a durable pub/sub channel.

pub mod event_bridge;
pub mod memory_pubsub;
pub mod pubsub;
pub mod redis_pubsub;

pub use event_bridge::EventBridge;
pub use memory_pubsub::MemoryPubSub;
pub use pubsub::{MessageStream, PubSub};
pub use redis_pubsub::RedisPubSub;
