//! Pub/sub broker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pub/sub broker (Redis) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    /// Redis connection URL.
    pub url: String,
    /// Channel name shared by all server processes.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Initial reconnect backoff in milliseconds.
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_ms: u64,
    /// Maximum reconnect backoff in milliseconds.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
    /// Subscribe attempts allowed before the first successful subscription
    /// is treated as a startup failure.
    #[serde(default = "default_startup_attempts")]
    pub startup_attempts: u32,
}

impl PubSubConfig {
    /// Initial backoff as a [`Duration`].
    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    /// Maximum backoff as a [`Duration`].
    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

fn default_channel() -> String {
    "beacon:events".to_string()
}

fn default_backoff_initial() -> u64 {
    500
}

fn default_backoff_max() -> u64 {
    30_000
}

fn default_startup_attempts() -> u32 {
    5
}
