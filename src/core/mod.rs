//! Core functionality for the chat hub

pub mod connection;
pub mod hub;
pub mod ip_extractor;
pub mod message;
pub mod rate_limiter;
pub mod registry;
pub mod server;

// Re-export main components for convenience
pub use connection::{ChannelSink, Connection, ConnectionHandle, MessageSink};
pub use hub::BroadcastHub;
pub use message::{InboundMessage, OutboundEvent, OutboundMessage};
pub use rate_limiter::{Clock, FixedWindowRateLimiter, SystemClock};
pub use registry::ConnectionRegistry;
pub use server::{ServerState, SharedServerState};
