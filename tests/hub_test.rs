// Broadcast hub behavior through the public library API

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use warp::ws::Message;

use rusty_chat_hub::core::{
    BroadcastHub, ChannelSink, Clock, Connection, ConnectionRegistry, FixedWindowRateLimiter,
    InboundMessage, MessageSink, OutboundEvent,
};
use rusty_chat_hub::error::{HubError, Result};

const PREFIX: &str = "Message from the server";

// Clock moved forward by hand to simulate window expiry
struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<OutboundEvent>>,
}

impl RecordingSink {
    fn recorded(&self) -> Vec<(String, String, String, String)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| {
                let (prefix, user, message, date_time) = e.message.fields();
                (
                    prefix.to_string(),
                    user.to_string(),
                    message.to_string(),
                    date_time.to_string(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn deliver(&self, event: &OutboundEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn build_hub(clock: Arc<ManualClock>) -> BroadcastHub {
    let limiter = FixedWindowRateLimiter::with_clock(10, Duration::from_secs(60), clock);
    BroadcastHub::new(Arc::new(ConnectionRegistry::new()), Arc::new(limiter))
}

fn register_recorder(hub: &BroadcastHub) -> Arc<RecordingSink> {
    let sink = Arc::new(RecordingSink::default());
    hub.registry()
        .register(Connection::new("unknown", sink.clone()))
        .unwrap();
    sink
}

fn hello() -> InboundMessage {
    InboundMessage::new("Alice", "hi", "t")
}

#[tokio::test]
async fn test_three_connections_receive_one_message() {
    let hub = build_hub(Arc::new(ManualClock::new()));
    let sinks: Vec<_> = (0..3).map(|_| register_recorder(&hub)).collect();

    let delivered = hub.handle_inbound("1.2.3.4", hello()).await.unwrap();

    assert_eq!(delivered, 3);
    let expected = (
        PREFIX.to_string(),
        "Alice".to_string(),
        "hi".to_string(),
        "t".to_string(),
    );
    for sink in &sinks {
        assert_eq!(sink.recorded(), vec![expected.clone()]);
    }
}

#[tokio::test]
async fn test_eleventh_call_in_window_is_rejected() {
    let hub = build_hub(Arc::new(ManualClock::new()));
    let sink = register_recorder(&hub);

    for call in 1..=10 {
        let result = hub.handle_inbound("1.2.3.4", hello()).await;
        assert!(result.is_ok(), "call {} should be admitted", call);
    }
    let before = sink.recorded().len();

    let result = hub.handle_inbound("1.2.3.4", hello()).await;

    assert!(matches!(result, Err(HubError::RateLimited)));
    assert_eq!(sink.recorded().len(), before);
}

#[tokio::test]
async fn test_sender_admitted_again_after_window() {
    let clock = Arc::new(ManualClock::new());
    let hub = build_hub(clock.clone());
    let sink = register_recorder(&hub);

    for _ in 0..10 {
        hub.handle_inbound("1.2.3.4", hello()).await.unwrap();
    }
    assert!(hub.handle_inbound("1.2.3.4", hello()).await.is_err());

    clock.advance(Duration::from_secs(60));

    assert_eq!(hub.handle_inbound("1.2.3.4", hello()).await.unwrap(), 1);
    assert_eq!(sink.recorded().len(), 11);
}

#[tokio::test]
async fn test_concurrent_registration() {
    let registry = Arc::new(ConnectionRegistry::new());
    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let sink: Arc<dyn MessageSink> = Arc::new(RecordingSink::default());
                registry.register(Connection::new("unknown", sink)).unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(registry.snapshot().len(), 50);
}

#[tokio::test]
async fn test_unregister_twice_is_noop() {
    let hub = build_hub(Arc::new(ManualClock::new()));
    let sink = Arc::new(RecordingSink::default());
    let handle = hub
        .registry()
        .register(Connection::new("unknown", sink.clone()))
        .unwrap();

    assert!(hub.registry().unregister(&handle.id));
    assert!(!hub.registry().unregister(&handle.id));
    assert!(hub
        .registry()
        .snapshot()
        .iter()
        .all(|h| h.id != handle.id));

    hub.handle_inbound("1.2.3.4", hello()).await.unwrap();
    assert!(sink.recorded().is_empty());
}

#[tokio::test]
async fn test_slow_client_is_dropped_without_blocking_others() {
    let hub = build_hub(Arc::new(ManualClock::new()));
    let fast = register_recorder(&hub);

    // A client whose outbound queue is already full and never drained
    let (tx, _rx) = mpsc::channel::<Message>(1);
    tx.try_send(Message::text("backlog")).unwrap();
    let slow = hub
        .registry()
        .register(Connection::new(
            "unknown",
            Arc::new(ChannelSink::new(tx, Duration::from_millis(50))),
        ))
        .unwrap();

    let delivered = hub.handle_inbound("1.2.3.4", hello()).await.unwrap();

    assert_eq!(delivered, 1);
    assert_eq!(fast.recorded().len(), 1);
    assert!(!hub.registry().contains(&slow.id));
    assert!(!slow.is_open());
}

#[tokio::test]
async fn test_concurrent_senders_all_broadcast() {
    let hub = Arc::new(build_hub(Arc::new(ManualClock::new())));
    let sink = register_recorder(&hub);

    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let hub = hub.clone();
            tokio::spawn(async move {
                hub.handle_inbound(
                    &format!("10.0.0.{}", i),
                    InboundMessage::new(format!("user{}", i), "hello", "t"),
                )
                .await
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }

    let mut users: Vec<String> = sink.recorded().into_iter().map(|r| r.1).collect();
    users.sort();
    assert_eq!(users, vec!["user0", "user1", "user2", "user3", "user4"]);
}

#[tokio::test]
async fn test_script_payload_is_escaped() {
    let hub = build_hub(Arc::new(ManualClock::new()));
    let sink = register_recorder(&hub);

    hub.handle_inbound(
        "1.2.3.4",
        InboundMessage::new("Alice", "<script>alert(1)</script>", "t"),
    )
    .await
    .unwrap();

    let (_, _, message, _) = sink.recorded().remove(0);
    assert!(!message.contains('<'));
    assert!(!message.contains('>'));
    assert_eq!(message, "&lt;script&gt;alert(1)&lt;/script&gt;");
}
