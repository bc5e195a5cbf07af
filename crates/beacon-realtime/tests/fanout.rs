//! End-to-end tests for hub fan-out and the pub/sub bridge.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use beacon_core::config::pubsub::PubSubConfig;
use beacon_core::error::AppError;
use beacon_core::event::Event;
use beacon_core::result::AppResult;
use beacon_core::traits::store::EventStore;
use beacon_realtime::bridge::{EventBridge, MemoryPubSub, MessageStream, PubSub};
use beacon_realtime::connection::ConnectionHandle;
use beacon_realtime::hub::{CloseReason, Hub};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Records inserted events; can be switched into failure mode.
#[derive(Default)]
struct RecordingStore {
    events: Mutex<Vec<Event>>,
    fail: AtomicBool,
}

impl RecordingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn inserted(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventStore for RecordingStore {
    async fn insert(&self, event: &Event) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::database("storage unavailable"));
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// A broker whose subscriptions always fail.
struct UnreachablePubSub;

#[async_trait]
impl PubSub for UnreachablePubSub {
    async fn publish(&self, _channel: &str, _payload: Bytes) -> AppResult<()> {
        Err(AppError::pub_sub("broker unreachable"))
    }

    async fn subscribe(&self, _channel: &str) -> AppResult<MessageStream> {
        Err(AppError::pub_sub("broker unreachable"))
    }
}

fn pubsub_config() -> PubSubConfig {
    PubSubConfig {
        url: "redis://unused".to_string(),
        channel: "beacon:events".to_string(),
        backoff_initial_ms: 1,
        backoff_max_ms: 10,
        startup_attempts: 3,
    }
}

fn sample_event(publisher: &str, content: &str) -> Event {
    Event::new(publisher, content, None)
}

/// Poll until the store holds `expected` events or the deadline passes.
async fn wait_for_inserts(store: &RecordingStore, expected: usize) -> Vec<Event> {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    loop {
        let events = store.inserted().await;
        if events.len() >= expected {
            return events;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("expected {expected} inserts, got {}", events.len());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_slow_consumer_does_not_block_fan_out() {
    let hub = Hub::spawn();

    // The slow consumer's queue holds 4 payloads and is never drained.
    let (slow, _slow_rx) = ConnectionHandle::new("slow", 4);
    let (fast, mut fast_rx) = ConnectionHandle::new("fast", 64);
    let slow_id = slow.id;

    hub.register(Arc::clone(&slow));
    hub.register(Arc::clone(&fast));

    for i in 0..20u8 {
        hub.broadcast(Bytes::from(vec![i]));
    }

    // The fast consumer receives every payload in order.
    for i in 0..20u8 {
        let payload = timeout(RECV_TIMEOUT, fast_rx.recv())
            .await
            .expect("delivery within bounded time")
            .expect("queue open");
        assert_eq!(payload[0], i);
    }

    // The slow consumer was evicted and ended closed.
    assert!(!hub.is_registered(slow_id).await);
    assert!(slow.is_closed());
    assert!(hub.is_registered(fast.id).await);
}

#[tokio::test]
async fn test_fifo_per_connection() {
    let hub = Hub::spawn();
    let (handle, mut rx) = ConnectionHandle::new("u1", 8);
    hub.register(handle);

    hub.broadcast(Bytes::from_static(b"E1"));
    hub.broadcast(Bytes::from_static(b"E2"));

    let first = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    let second = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(&first[..], b"E1");
    assert_eq!(&second[..], b"E2");
}

#[tokio::test]
async fn test_cross_process_fan_out() {
    // Two "processes": independent hubs and bridges sharing one broker.
    let pubsub = Arc::new(MemoryPubSub::new(64));
    let hub_a = Hub::spawn();
    let hub_b = Hub::spawn();
    let store_a = RecordingStore::new();
    let store_b = RecordingStore::new();

    let bridge_a = Arc::new(EventBridge::new(
        pubsub.clone(),
        store_a.clone(),
        hub_a.clone(),
        pubsub_config(),
    ));
    let bridge_b = Arc::new(EventBridge::new(
        pubsub.clone(),
        store_b.clone(),
        hub_b.clone(),
        pubsub_config(),
    ));

    let shutdown = CancellationToken::new();
    let sub_a = {
        let bridge = Arc::clone(&bridge_a);
        let token = shutdown.clone();
        tokio::spawn(async move { bridge.run_subscriber(token).await })
    };
    let sub_b = {
        let bridge = Arc::clone(&bridge_b);
        let token = shutdown.clone();
        tokio::spawn(async move { bridge.run_subscriber(token).await })
    };

    // Let both subscribers attach before publishing (no backing store of
    // unacknowledged publishes).
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A connection registered only on process B.
    let (conn_b, mut rx_b) = ConnectionHandle::new("u1", 8);
    hub_b.register(conn_b);

    let event = sample_event("u1", "hello");
    bridge_a.publish(&event).await.unwrap();

    // The connection on B sees the event published via A, and it decodes
    // field-for-field equal to the original.
    let raw = timeout(RECV_TIMEOUT, rx_b.recv()).await.unwrap().unwrap();
    let received: Event = serde_json::from_slice(&raw).unwrap();
    assert_eq!(received, event);

    // Each process persisted the event exactly once.
    let inserted_a = wait_for_inserts(&store_a, 1).await;
    let inserted_b = wait_for_inserts(&store_b, 1).await;
    assert_eq!(inserted_a, vec![event.clone()]);
    assert_eq!(inserted_b, vec![event]);

    shutdown.cancel();
    assert!(sub_a.await.unwrap().is_ok());
    assert!(sub_b.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_persistence_failure_does_not_block_delivery() {
    let pubsub = Arc::new(MemoryPubSub::new(64));
    let hub = Hub::spawn();
    let store = RecordingStore::new();
    store.fail.store(true, Ordering::SeqCst);

    let bridge = Arc::new(EventBridge::new(
        pubsub,
        store.clone(),
        hub.clone(),
        pubsub_config(),
    ));

    let shutdown = CancellationToken::new();
    let subscriber = {
        let bridge = Arc::clone(&bridge);
        let token = shutdown.clone();
        tokio::spawn(async move { bridge.run_subscriber(token).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (conn, mut rx) = ConnectionHandle::new("u1", 8);
    hub.register(conn);

    let event = sample_event("u1", "storage is down");
    bridge.publish(&event).await.unwrap();

    // Broadcast still happens even though the insert failed.
    let raw = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    let received: Event = serde_json::from_slice(&raw).unwrap();
    assert_eq!(received, event);
    assert!(store.inserted().await.is_empty());

    // The subscriber stream survived the failure.
    store.fail.store(false, Ordering::SeqCst);
    let second = sample_event("u1", "storage is back");
    bridge.publish(&second).await.unwrap();
    let inserted = wait_for_inserts(&store, 1).await;
    assert_eq!(inserted, vec![second]);

    shutdown.cancel();
    assert!(subscriber.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_initial_subscription_failure_is_surfaced() {
    let hub = Hub::spawn();
    let store = RecordingStore::new();
    let bridge = EventBridge::new(
        Arc::new(UnreachablePubSub),
        store,
        hub,
        pubsub_config(),
    );

    let result = bridge.run_subscriber(CancellationToken::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_registry_membership_under_random_interleavings() {
    use rand::RngExt;

    let hub = Hub::spawn();
    let mut rng = rand::rng();

    // Receivers are kept alive so queues stay open; capacity exceeds the
    // maximum number of broadcasts so nothing is evicted for overflow.
    let mut live = Vec::new();
    let mut removed = Vec::new();
    let mut receivers = Vec::new();

    for _ in 0..500 {
        match rng.random_range(0..3u8) {
            0 => {
                let (handle, rx) = ConnectionHandle::new("fuzz", 1024);
                live.push(handle.id);
                receivers.push(rx);
                hub.register(handle);
            }
            1 => {
                if !live.is_empty() {
                    let idx = rng.random_range(0..live.len());
                    let id = live.swap_remove(idx);
                    hub.unregister(id, CloseReason::PeerClosed);
                    removed.push(id);
                }
            }
            _ => {
                hub.broadcast(Bytes::from_static(b"tick"));
            }
        }
    }

    // Commands are processed in send order, so the final state is exact.
    assert_eq!(hub.connection_count().await, live.len());
    for id in live {
        assert!(hub.is_registered(id).await);
    }
    for id in removed {
        assert!(!hub.is_registered(id).await);
    }
}
