//! Liveness monitoring for a single connection.
//!
//! Pings are written by the connection's write loop on its own interval;
//! this loop only checks how long ago the last pong was observed and
//! evicts the connection once the timeout window is exceeded.

use std::sync::Arc;

use tokio::time;
use tracing::{debug, warn};

use beacon_core::config::realtime::RealtimeConfig;

use crate::connection::handle::ConnectionHandle;
use crate::hub::{CloseReason, HubHandle};

/// Run the liveness check loop for one connection.
///
/// Exits when the connection is closed or when it times out, in which case
/// the connection is unregistered from the hub with a
/// [`CloseReason::LivenessTimeout`].
pub async fn run_liveness(handle: Arc<ConnectionHandle>, hub: HubHandle, config: RealtimeConfig) {
    let timeout = config.liveness_timeout();
    let mut interval = time::interval(config.liveness_check_interval());

    loop {
        tokio::select! {
            _ = handle.cancelled() => {
                break;
            }
            _ = interval.tick() => {
                let elapsed = handle.last_pong().await.elapsed();
                if elapsed > timeout {
                    warn!(
                        conn_id = %handle.id,
                        principal_id = %handle.principal_id,
                        elapsed_secs = elapsed.as_secs(),
                        "Liveness timeout, evicting connection"
                    );
                    hub.unregister(handle.id, CloseReason::LivenessTimeout);
                    break;
                }
            }
        }
    }

    debug!(conn_id = %handle.id, "Liveness loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Hub;

    fn test_config() -> RealtimeConfig {
        RealtimeConfig {
            queue_capacity: 8,
            ping_interval_seconds: 15,
            liveness_check_interval_seconds: 10,
            liveness_timeout_seconds: 45,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_connection_is_evicted_after_timeout() {
        let hub = Hub::spawn();
        let (handle, _rx) = ConnectionHandle::new("u1", 8);
        let id = handle.id;

        hub.register(Arc::clone(&handle));
        assert!(hub.is_registered(id).await);

        let monitor = tokio::spawn(run_liveness(
            Arc::clone(&handle),
            hub.clone(),
            test_config(),
        ));

        // Not yet past the 45s window: still registered.
        time::sleep(time::Duration::from_secs(40)).await;
        assert!(hub.is_registered(id).await);

        // Past the window plus one check interval: evicted.
        time::sleep(time::Duration::from_secs(20)).await;
        assert!(!hub.is_registered(id).await);
        assert!(handle.is_closed());

        monitor.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pongs_keep_connection_alive() {
        let hub = Hub::spawn();
        let (handle, _rx) = ConnectionHandle::new("u1", 8);
        let id = handle.id;

        hub.register(Arc::clone(&handle));
        tokio::spawn(run_liveness(
            Arc::clone(&handle),
            hub.clone(),
            test_config(),
        ));

        // Pong every 30s, well inside the 45s window.
        for _ in 0..4 {
            time::sleep(time::Duration::from_secs(30)).await;
            handle.record_pong().await;
        }

        assert!(hub.is_registered(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_exits_when_connection_closes() {
        let hub = Hub::spawn();
        let (handle, _rx) = ConnectionHandle::new("u1", 8);

        let monitor = tokio::spawn(run_liveness(
            Arc::clone(&handle),
            hub.clone(),
            test_config(),
        ));

        handle.close();
        monitor.await.unwrap();
    }
}
