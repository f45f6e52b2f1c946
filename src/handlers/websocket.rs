use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::connection::{ChannelSink, Connection};
use crate::core::message::{rate_limited_notice, InboundMessage};
use crate::core::server::SharedServerState;
use crate::error::HubError;

// Handle a WebSocket connection
pub async fn handle_ws_client(ws: WebSocket, source_key: String, state: SharedServerState) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::channel::<Message>(state.config.outbound_buffer);

    let registry = state.hub.registry().clone();
    let sink = Arc::new(ChannelSink::new(tx.clone(), state.config.send_timeout));

    // Register the client
    let handle = match registry.register(Connection::new(source_key.clone(), sink)) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to register client from {}: {}", source_key, e);
            let _ = ws_tx.close().await;
            return;
        }
    };

    // Spawn a task to forward messages from our channel to the WebSocket
    let writer_handle = handle.clone();
    tokio::task::spawn(async move {
        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => {
                        if let Err(e) = ws_tx.send(message).await {
                            debug!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }
                    None => break,
                },
                _ = writer_handle.closed() => break,
            }
        }
        let _ = ws_tx.close().await;
    });

    info!("Client connected: {} from {}", handle.id, source_key);
    info!("Current connections: {}", registry.len());

    // Handle incoming messages one at a time to keep per-connection order.
    // The session ends when the client leaves or the hub drops the connection.
    loop {
        tokio::select! {
            _ = handle.closed() => {
                info!("Closing socket of dropped client {}", handle.id);
                break;
            }
            next = ws_rx.next() => match next {
                Some(Ok(msg)) => {
                    if msg.is_close() {
                        break;
                    }
                    // Only process text messages
                    if msg.is_text() {
                        process_message(msg, &source_key, &tx, &state).await;
                    }
                }
                Some(Err(e)) => {
                    warn!("WebSocket error for client {}: {}", handle.id, e);
                    break;
                }
                None => break,
            },
        }
    }

    // Client disconnected
    registry.unregister(&handle.id);
    info!(
        "Client disconnected: {} after {}s",
        handle.id,
        handle.connection_duration().num_seconds()
    );
    info!("Current connections: {}", registry.len());
}

// Process an incoming WebSocket message
async fn process_message(
    msg: Message,
    source_key: &str,
    reply_tx: &mpsc::Sender<Message>,
    state: &SharedServerState,
) {
    // Extract the message content
    let msg_str = match msg.to_str() {
        Ok(s) => s,
        Err(_) => {
            warn!("Failed to extract text from message");
            return;
        }
    };

    if msg_str.len() > state.config.max_message_size {
        warn!("Dropping message from {}: {}", source_key, HubError::MessageTooLarge(msg_str.len()));
        return;
    }

    let inbound = match serde_json::from_str::<InboundMessage>(msg_str) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!("Failed to parse message from {}: {}", source_key, HubError::from(e));
            return;
        }
    };

    match state.hub.handle_inbound(source_key, inbound).await {
        Ok(count) => debug!("Message from {} delivered to {} clients", source_key, count),
        Err(HubError::RateLimited) => {
            info!("Rate limited message from {}", source_key);
            notify_rate_limited(reply_tx);
        }
        Err(e) => error!("Failed to broadcast message from {}: {}", source_key, e),
    }
}

// Tell only the rejected sender to back off
fn notify_rate_limited(reply_tx: &mpsc::Sender<Message>) {
    let notice = match rate_limited_notice() {
        Ok(notice) => notice,
        Err(e) => {
            error!("Failed to serialize rate limit notice: {}", e);
            return;
        }
    };
    if reply_tx.try_send(Message::text(notice)).is_err() {
        debug!("Dropped rate limit notice, outbound queue full or closed");
    }
}
