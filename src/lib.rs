//! Rusty Chat Hub - a real-time WebSocket chat server
//!
//! This library provides a connection registry, a fixed-window rate
//! limiter keyed by client IP and a broadcast hub that sanitizes chat
//! messages and fans them out to every connected client.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod security;

// Re-export main components
pub use config::*;
pub use constants::*;
