//! Broadcast hub: admission, sanitization and fan-out of chat messages

use futures_util::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::constants::{DEFAULT_MESSAGE_PREFIX, RECEIVE_MESSAGE_EVENT};
use crate::core::connection::ConnectionHandle;
use crate::core::message::{InboundMessage, OutboundEvent, OutboundMessage};
use crate::core::rate_limiter::FixedWindowRateLimiter;
use crate::core::registry::ConnectionRegistry;
use crate::error::{HubError, Result};

pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
    limiter: Arc<FixedWindowRateLimiter>,
    prefix: String,
    event_name: String,
}

impl BroadcastHub {
    pub fn new(registry: Arc<ConnectionRegistry>, limiter: Arc<FixedWindowRateLimiter>) -> Self {
        Self::with_prefix(registry, limiter, DEFAULT_MESSAGE_PREFIX)
    }

    pub fn with_prefix(
        registry: Arc<ConnectionRegistry>,
        limiter: Arc<FixedWindowRateLimiter>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            limiter,
            prefix: prefix.into(),
            event_name: RECEIVE_MESSAGE_EVENT.to_string(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Admit, sanitize and broadcast one inbound message.
    ///
    /// Returns the number of connections the message was delivered to. Only
    /// `RateLimited` is ever returned as an error; failed deliveries drop the
    /// failing connection from the registry and are otherwise absorbed.
    pub async fn handle_inbound(&self, source_key: &str, inbound: InboundMessage) -> Result<usize> {
        if !self.limiter.try_acquire(source_key) {
            debug!("Rejected message from {}: rate limit exceeded", source_key);
            return Err(HubError::RateLimited);
        }

        let outbound = OutboundMessage::from_inbound(&self.prefix, &inbound);
        let event = OutboundEvent::new(self.event_name.clone(), outbound);

        let targets = self.registry.snapshot();
        let total = targets.len();
        let results = join_all(targets.iter().map(|handle| self.deliver_one(handle, &event))).await;
        let delivered = results.into_iter().filter(|ok| *ok).count();

        info!(
            "Broadcast message from {} to {}/{} clients",
            source_key, delivered, total
        );
        Ok(delivered)
    }

    async fn deliver_one(&self, handle: &ConnectionHandle, event: &OutboundEvent) -> bool {
        match handle.deliver(event).await {
            Ok(()) => true,
            Err(HubError::ConnectionClosed) => {
                debug!("Skipping closed connection {}", handle.id);
                self.registry.unregister(&handle.id);
                false
            }
            Err(e) => {
                warn!("Dropping client {} after failed delivery: {}", handle.id, e);
                self.registry.unregister(&handle.id);
                false
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}
