//! The bridge between the durable pub/sub channel and the local hub.
//!
//! Publishing is fire-and-forget: the event goes to the broker and every
//! subscribed process (including the publisher's own) picks it up, persists
//! it, and fans it out to its local connections. This is what lets N server
//! processes behind a load balancer share one logical event stream.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use beacon_core::config::pubsub::PubSubConfig;
use beacon_core::error::AppError;
use beacon_core::event::Event;
use beacon_core::result::AppResult;
use beacon_core::traits::store::EventStore;

use crate::hub::HubHandle;

use super::pubsub::PubSub;

/// Bridges published events to every process's local hub.
pub struct EventBridge {
    pubsub: Arc<dyn PubSub>,
    store: Arc<dyn EventStore>,
    hub: HubHandle,
    config: PubSubConfig,
}

impl EventBridge {
    /// Create a new bridge.
    pub fn new(
        pubsub: Arc<dyn PubSub>,
        store: Arc<dyn EventStore>,
        hub: HubHandle,
        config: PubSubConfig,
    ) -> Self {
        Self {
            pubsub,
            store,
            hub,
            config,
        }
    }

    /// Serialize an event and publish it on the shared channel.
    ///
    /// Returns the result of the publish call itself; delivery and
    /// persistence happen in the subscriber path of whichever processes
    /// are subscribed at that moment.
    pub async fn publish(&self, event: &Event) -> AppResult<()> {
        let payload = serde_json::to_vec(event)?;
        self.pubsub
            .publish(&self.config.channel, Bytes::from(payload))
            .await
    }

    /// Run the subscriber loop until the shutdown signal fires.
    ///
    /// Each received event is persisted (failures are logged, never fatal)
    /// and then handed to the local hub for fan-out. A lost subscription is
    /// re-established with capped exponential backoff; exhausting the
    /// attempt budget before the first successful subscription is an error
    /// surfaced to the owning process.
    pub async fn run_subscriber(&self, shutdown: CancellationToken) -> AppResult<()> {
        let mut backoff = self.config.backoff_initial();
        let mut startup_attempts = 0u32;
        let mut subscribed_once = false;

        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }

            let mut stream = match self.pubsub.subscribe(&self.config.channel).await {
                Ok(stream) => {
                    backoff = self.config.backoff_initial();
                    subscribed_once = true;
                    info!(channel = %self.config.channel, "Subscribed to event channel");
                    stream
                }
                Err(e) => {
                    if !subscribed_once {
                        startup_attempts += 1;
                        if startup_attempts >= self.config.startup_attempts {
                            return Err(AppError::pub_sub(format!(
                                "Failed to establish initial subscription after {} attempts: {e}",
                                startup_attempts
                            )));
                        }
                    }
                    warn!(
                        channel = %self.config.channel,
                        error = %e,
                        retry_in_ms = backoff.as_millis() as u64,
                        "Subscription failed, retrying"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => return Ok(()),
                        _ = time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(self.config.backoff_max());
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return Ok(()),
                    next = stream.next() => match next {
                        // The in-flight persist + broadcast pair completes
                        // before the next cancellation check.
                        Some(raw) => self.handle_message(raw).await,
                        None => {
                            warn!(channel = %self.config.channel, "Subscription lost, resubscribing");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Persist and fan out one received message.
    async fn handle_message(&self, raw: Bytes) {
        let event: Event = match serde_json::from_slice(&raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable event payload");
                return;
            }
        };

        // Persistence failure must not block delivery: local clients still
        // see the notification, and the storage outage is logged.
        if let Err(e) = self.store.insert(&event).await {
            error!(
                publisher_id = %event.publisher_id,
                error = %e,
                "Failed to persist event, continuing"
            );
        }

        // Re-broadcast the raw received bytes, never a re-serialization.
        self.hub.broadcast(raw);
    }
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("channel", &self.config.channel)
            .finish()
    }
}
