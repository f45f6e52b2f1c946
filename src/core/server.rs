//! Server state that wires the registry, limiters and hub together

use log::info;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::hub::BroadcastHub;
use crate::core::ip_extractor::IpExtractionConfig;
use crate::core::rate_limiter::FixedWindowRateLimiter;
use crate::core::registry::ConnectionRegistry;

/// Components that live for the whole process
pub struct ServerState {
    pub config: ServerConfig,
    pub hub: Arc<BroadcastHub>,
    /// Limits chat messages per source
    pub message_limiter: Arc<FixedWindowRateLimiter>,
    /// Limits HTTP requests per source
    pub http_limiter: Arc<FixedWindowRateLimiter>,
    pub ip_config: IpExtractionConfig,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let message_limiter = Arc::new(Self::limiter(&config));
        let http_limiter = Arc::new(Self::limiter(&config));
        let hub = Arc::new(BroadcastHub::with_prefix(
            registry,
            message_limiter.clone(),
            config.message_prefix.clone(),
        ));
        let ip_config = IpExtractionConfig::from_server_config(&config);

        Self {
            config,
            hub,
            message_limiter,
            http_limiter,
            ip_config,
        }
    }

    fn limiter(config: &ServerConfig) -> FixedWindowRateLimiter {
        FixedWindowRateLimiter::new(config.rate_limit_permits, config.rate_limit_window)
            .with_max_tracked_keys(config.rate_limit_max_keys)
    }

    /// Start periodic sweeps of both limiters
    pub fn start_cleanup_tasks(&self) {
        info!(
            "Starting rate limiter sweeps every {:?}",
            self.config.sweep_interval
        );
        self.message_limiter
            .clone()
            .start_cleanup_task(self.config.sweep_interval);
        self.http_limiter
            .clone()
            .start_cleanup_task(self.config.sweep_interval);
    }
}

// Shared reference to server state
pub type SharedServerState = Arc<ServerState>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_limiters_follow_config() {
        let mut config = ServerConfig::default();
        config.rate_limit_permits = 3;
        config.rate_limit_window = Duration::from_secs(5);
        let state = ServerState::new(config);

        assert_eq!(state.message_limiter.permit_limit(), 3);
        assert_eq!(state.http_limiter.window(), Duration::from_secs(5));
        assert_eq!(state.hub.prefix(), crate::constants::DEFAULT_MESSAGE_PREFIX);
        assert_eq!(state.hub.connection_count(), 0);
    }

    #[test]
    fn test_limiters_are_separate() {
        let state = ServerState::new(ServerConfig::default());
        for _ in 0..10 {
            assert!(state.http_limiter.try_acquire("1.2.3.4"));
        }
        assert!(!state.http_limiter.try_acquire("1.2.3.4"));
        assert!(state.message_limiter.try_acquire("1.2.3.4"));
    }
}
