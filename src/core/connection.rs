//! WebSocket connection management
//! Handles the per-connection state and its outbound send capability

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;
use warp::ws::Message;

use crate::core::message::OutboundEvent;
use crate::error::{HubError, Result};

/// Outbound send capability of a single client
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Push one event to the client
    async fn deliver(&self, event: &OutboundEvent) -> Result<()>;
}

/// Sink backed by the bounded queue a connection's writer task drains
pub struct ChannelSink {
    sender: mpsc::Sender<Message>,
    send_timeout: Duration,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<Message>, send_timeout: Duration) -> Self {
        Self {
            sender,
            send_timeout,
        }
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn deliver(&self, event: &OutboundEvent) -> Result<()> {
        let text = event.to_json()?;
        // A full queue means the client is not reading; give up after the timeout
        match tokio::time::timeout(self.send_timeout, self.sender.send(Message::text(text))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(HubError::ConnectionClosed),
            Err(_) => Err(HubError::DeliveryFailure(format!(
                "outbound queue full for {:?}",
                self.send_timeout
            ))),
        }
    }
}

/// Represents the state of a single client connection
pub struct Connection {
    pub id: String,
    /// Remote source key (client IP or "unknown")
    pub source_key: String,
    pub connected_at: DateTime<Utc>,
    pub(crate) seq: u64,
    sink: Arc<dyn MessageSink>,
    open: AtomicBool,
    closed: Notify,
}

/// Shared handle to a registered connection
pub type ConnectionHandle = Arc<Connection>;

impl Connection {
    /// Create a new connection with a unique ID
    pub fn new(source_key: impl Into<String>, sink: Arc<dyn MessageSink>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), source_key, sink)
    }

    pub fn with_id(
        id: impl Into<String>,
        source_key: impl Into<String>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            id: id.into(),
            source_key: source_key.into(),
            connected_at: Utc::now(),
            seq: 0,
            sink,
            open: AtomicBool::new(true),
            closed: Notify::new(),
        }
    }

    /// Deliver an event unless the connection has been closed
    pub async fn deliver(&self, event: &OutboundEvent) -> Result<()> {
        if !self.is_open() {
            return Err(HubError::ConnectionClosed);
        }
        self.sink.deliver(event).await
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.closed.notify_waiters();
    }

    /// Resolves once the connection has been closed by the registry
    pub async fn closed(&self) {
        loop {
            let notified = self.closed.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent close is not missed
            notified.as_mut().enable();
            if !self.is_open() {
                return;
            }
            notified.await;
        }
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }
}
