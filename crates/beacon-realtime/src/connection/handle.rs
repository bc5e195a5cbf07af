//! Individual client connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Why an [`enqueue`](ConnectionHandle::enqueue) call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The outbound queue is full; the connection is a slow consumer.
    Full,
    /// The connection is closed or its write loop has exited.
    Closed,
}

/// A handle to a single client connection.
///
/// The hub holds the handle and writes to its bounded outbound queue; the
/// connection's own write loop drains the paired receiver. The last-pong
/// timestamp is written only by the connection's inbound path.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Principal that owns this connection (supplied by the auth collaborator).
    pub principal_id: String,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Sender side of the bounded outbound queue.
    sender: mpsc::Sender<Bytes>,
    /// Last time a liveness acknowledgment (pong) was observed.
    last_pong: RwLock<Instant>,
    /// Set once, on the first close.
    closed: AtomicBool,
    /// Cancellation signal observed by the write and liveness loops.
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle with an outbound queue of the given
    /// capacity. Returns the handle and the receiver the write loop drains.
    pub fn new(
        principal_id: impl Into<String>,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let handle = Arc::new(Self {
            id: Uuid::new_v4(),
            principal_id: principal_id.into(),
            connected_at: Utc::now(),
            sender,
            last_pong: RwLock::new(Instant::now()),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        });
        (handle, receiver)
    }

    /// Append a payload to the outbound queue without blocking.
    ///
    /// A `Full` result means this connection cannot keep up; the caller is
    /// expected to evict it rather than wait.
    pub fn enqueue(&self, payload: Bytes) -> Result<(), EnqueueError> {
        if self.is_closed() {
            return Err(EnqueueError::Closed);
        }
        match self.sender.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(EnqueueError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EnqueueError::Closed),
        }
    }

    /// Close the connection, signalling its loops to exit. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Record a liveness acknowledgment from the peer.
    pub async fn record_pong(&self) {
        let mut lp = self.last_pong.write().await;
        *lp = Instant::now();
    }

    /// Last time a pong was observed.
    pub async fn last_pong(&self) -> Instant {
        *self.last_pong.read().await
    }

    /// Resolves when the connection is closed.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}
