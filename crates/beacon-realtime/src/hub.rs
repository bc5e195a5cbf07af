//! Hub event loop — the single authoritative registry of live connections.
//!
//! The registry is owned exclusively by the hub's own task. External
//! callers never touch it directly; they send commands through a
//! [`HubHandle`], so register/unregister/broadcast are serialized and
//! broadcast-time iteration can never race with membership changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::connection::handle::{ConnectionHandle, ConnectionId, EnqueueError};

/// Why a connection was unregistered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection cleanly.
    PeerClosed,
    /// The transport failed while reading.
    ReadError,
    /// No liveness acknowledgment within the timeout window.
    LivenessTimeout,
    /// The outbound queue overflowed during a broadcast.
    SlowConsumer,
    /// The server process is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "peer_closed"),
            Self::ReadError => write!(f, "read_error"),
            Self::LivenessTimeout => write!(f, "liveness_timeout"),
            Self::SlowConsumer => write!(f, "slow_consumer"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Requests processed by the hub's event loop.
enum HubCommand {
    Register(Arc<ConnectionHandle>),
    Unregister(ConnectionId, CloseReason),
    Broadcast(Bytes),
    Count(oneshot::Sender<usize>),
    Contains(ConnectionId, oneshot::Sender<bool>),
}

/// The hub task. One instance per server process, created at startup.
pub struct Hub {
    rx: mpsc::UnboundedReceiver<HubCommand>,
    registry: HashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl Hub {
    /// Spawn the hub event loop and return the handle used to reach it.
    pub fn spawn() -> HubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            rx,
            registry: HashMap::new(),
        };
        tokio::spawn(hub.run());
        HubHandle { tx }
    }

    /// Process commands until every handle is dropped, then close any
    /// remaining connections.
    async fn run(mut self) {
        info!("Hub event loop started");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                HubCommand::Register(handle) => self.register(handle),
                HubCommand::Unregister(id, reason) => self.unregister(id, reason),
                HubCommand::Broadcast(payload) => self.broadcast(payload),
                HubCommand::Count(reply) => {
                    let _ = reply.send(self.registry.len());
                }
                HubCommand::Contains(id, reply) => {
                    let _ = reply.send(self.registry.contains_key(&id));
                }
            }
        }

        for (id, handle) in self.registry.drain() {
            handle.close();
            debug!(conn_id = %id, reason = %CloseReason::Shutdown, "Connection closed");
        }
        info!("Hub event loop stopped");
    }

    fn register(&mut self, handle: Arc<ConnectionHandle>) {
        let id = handle.id;
        let principal = handle.principal_id.clone();
        if let Some(previous) = self.registry.insert(id, handle) {
            // Upstream id generation makes this unreachable in practice.
            warn!(conn_id = %id, "Duplicate connection id registered, replacing");
            previous.close();
        }
        info!(
            conn_id = %id,
            principal_id = %principal,
            connections = self.registry.len(),
            "Connection registered"
        );
    }

    /// Remove a connection if present. Unregistering an absent connection
    /// is a no-op: whichever of read-error, liveness timeout, or eviction
    /// triggers first wins, and the losers are harmless.
    fn unregister(&mut self, id: ConnectionId, reason: CloseReason) {
        if let Some(handle) = self.registry.remove(&id) {
            handle.close();
            info!(
                conn_id = %id,
                principal_id = %handle.principal_id,
                reason = %reason,
                connections = self.registry.len(),
                "Connection unregistered"
            );
        }
    }

    /// Enqueue the payload to every registered connection. A connection
    /// whose queue is full (or already closed) is evicted inline instead
    /// of blocking the rest of the fan-out.
    fn broadcast(&mut self, payload: Bytes) {
        let mut evicted: Vec<(ConnectionId, CloseReason)> = Vec::new();

        for (id, handle) in &self.registry {
            match handle.enqueue(payload.clone()) {
                Ok(()) => {}
                Err(EnqueueError::Full) => {
                    warn!(
                        conn_id = %id,
                        principal_id = %handle.principal_id,
                        "Outbound queue full, evicting slow consumer"
                    );
                    evicted.push((*id, CloseReason::SlowConsumer));
                }
                Err(EnqueueError::Closed) => {
                    evicted.push((*id, CloseReason::PeerClosed));
                }
            }
        }

        for (id, reason) in evicted {
            self.unregister(id, reason);
        }
    }
}

/// Cloneable handle for sending requests into the hub's event loop.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    /// Register a connection, making it eligible for subsequent broadcasts.
    pub fn register(&self, handle: Arc<ConnectionHandle>) {
        let _ = self.tx.send(HubCommand::Register(handle));
    }

    /// Unregister a connection. Safe to call more than once per connection.
    pub fn unregister(&self, id: ConnectionId, reason: CloseReason) {
        let _ = self.tx.send(HubCommand::Unregister(id, reason));
    }

    /// Broadcast a serialized event payload to all registered connections.
    pub fn broadcast(&self, payload: Bytes) {
        let _ = self.tx.send(HubCommand::Broadcast(payload));
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(HubCommand::Count(reply)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Whether a connection is currently registered.
    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(HubCommand::Contains(id, reply)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }
}
