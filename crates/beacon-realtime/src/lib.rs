//! # beacon-realtime
//!
//! Real-time fan-out core for Beacon. Provides:
//!
//! - A hub event loop that owns the connection registry exclusively
//! - Per-connection handles with bounded outbound queues
//! - Ping/pong liveness monitoring with timeout eviction
//! - A pub/sub bridge (Redis or in-memory) for multi-process fan-out

pub mod bridge;
pub mod connection;
pub mod hub;

pub use bridge::EventBridge;
pub use connection::ConnectionHandle;
pub use hub::{CloseReason, Hub, HubHandle};
