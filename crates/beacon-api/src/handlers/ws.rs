//! WebSocket upgrade handler and per-connection pump loops.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{info, warn};

use beacon_realtime::connection::ConnectionHandle;
use beacon_realtime::connection::heartbeat::run_liveness;
use beacon_realtime::hub::CloseReason;

use crate::error::ApiError;
use crate::extractors::Principal;
use crate::state::AppState;

/// GET /ws — WebSocket upgrade.
///
/// The principal is established before the upgrade; the socket is then
/// wrapped in a connection handle and registered with the hub.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    principal: Principal,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    Ok(ws.on_upgrade(move |socket| handle_socket(state, principal, socket)))
}

/// Runs an established WebSocket connection to completion.
///
/// Spawns the write and liveness loops and drives the read loop inline.
/// Whichever of read error, peer close, liveness timeout, or hub eviction
/// happens first triggers the (idempotent) unregister.
async fn handle_socket(state: AppState, principal: Principal, socket: WebSocket) {
    let realtime = state.config.realtime.clone();
    let (handle, outbound_rx) = ConnectionHandle::new(principal.id, realtime.queue_capacity);
    let conn_id = handle.id;

    state.hub.register(Arc::clone(&handle));

    let (ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(write_loop(
        ws_tx,
        outbound_rx,
        Arc::clone(&handle),
        realtime.ping_interval(),
    ));
    let monitor = tokio::spawn(run_liveness(
        Arc::clone(&handle),
        state.hub.clone(),
        realtime,
    ));

    // Read loop: inbound frames are consumed only for liveness
    // acknowledgments and close/error detection.
    let reason = loop {
        match ws_rx.next().await {
            Some(Ok(Message::Pong(_))) => handle.record_pong().await,
            Some(Ok(Message::Close(_))) | None => break CloseReason::PeerClosed,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket read error");
                break CloseReason::ReadError;
            }
        }
    };

    state.hub.unregister(conn_id, reason);
    // Covers the case where the hub task is already gone.
    handle.close();

    let _ = writer.await;
    let _ = monitor.await;

    info!(conn_id = %conn_id, reason = %reason, "WebSocket connection closed");
}

/// Drains the outbound queue to the socket in FIFO order and sends a
/// liveness ping on a fixed interval. Exits when the connection is closed,
/// the queue is closed, or a write fails.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Bytes>,
    handle: Arc<ConnectionHandle>,
    ping_interval: Duration,
) {
    let mut ping = time::interval(ping_interval);
    ping.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            _ = handle.cancelled() => break,
            maybe = outbound.recv() => match maybe {
                Some(payload) => {
                    if ws_tx.send(Message::Binary(payload)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
}
