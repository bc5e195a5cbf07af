//! Real-time WebSocket engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
///
/// The heartbeat constants must stay self-consistent: the ping interval
/// has to be shorter than the liveness timeout, and the liveness check
/// interval must not exceed the timeout, otherwise a freshly pinged
/// connection can be declared dead before its pong has a chance to arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound queue capacity per connection.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Liveness check interval in seconds.
    #[serde(default = "default_liveness_check_interval")]
    pub liveness_check_interval_seconds: u64,
    /// Seconds without a pong before a connection is considered dead.
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_seconds: u64,
}

impl RealtimeConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Liveness check interval as a [`Duration`].
    pub fn liveness_check_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_check_interval_seconds)
    }

    /// Liveness timeout as a [`Duration`].
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            ping_interval_seconds: default_ping_interval(),
            liveness_check_interval_seconds: default_liveness_check_interval(),
            liveness_timeout_seconds: default_liveness_timeout(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    15
}

fn default_liveness_check_interval() -> u64 {
    10
}

fn default_liveness_timeout() -> u64 {
    45
}
