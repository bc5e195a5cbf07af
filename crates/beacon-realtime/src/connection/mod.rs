//! Connection handles and per-connection liveness monitoring.

pub mod handle;
pub mod heartbeat;

pub use handle::{ConnectionHandle, ConnectionId, EnqueueError};
