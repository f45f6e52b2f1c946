//! Server configuration module
//! Handles dynamic configuration parameters for the chat hub

use crate::constants::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_HOST, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_TRACKED_KEYS,
    DEFAULT_MESSAGE_PREFIX, DEFAULT_OUTBOUND_BUFFER, DEFAULT_PERMIT_LIMIT, DEFAULT_PORT,
    DEFAULT_RATE_WINDOW_SECS, DEFAULT_SEND_TIMEOUT_MS, DEFAULT_STATIC_DIR,
    DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::error::{HubError, Result};
use log::warn;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The single origin allowed by the CORS policy
    pub allowed_origin: String,
    /// Directory holding the bundled frontend
    pub static_dir: String,
    /// Fixed text placed in front of every broadcast message
    pub message_prefix: String,
    /// Permits per source key per window
    pub rate_limit_permits: u32,
    pub rate_limit_window: Duration,
    /// Maximum number of source keys each limiter tracks
    pub rate_limit_max_keys: usize,
    /// Interval between limiter sweeps
    pub sweep_interval: Duration,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// How long a broadcast waits on a full outbound queue before dropping the client
    pub send_timeout: Duration,
    pub max_message_size: usize,
    /// Trust X-Forwarded-For / X-Real-IP from the proxies below
    pub trust_proxy_headers: bool,
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            message_prefix: DEFAULT_MESSAGE_PREFIX.to_string(),
            rate_limit_permits: DEFAULT_PERMIT_LIMIT,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_WINDOW_SECS),
            rate_limit_max_keys: DEFAULT_MAX_TRACKED_KEYS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            trust_proxy_headers: false,
            trusted_proxies: Vec::new(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid value '{}' for {}, using the default", raw, key);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false)
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let trusted_proxies = match env::var("CHAT_HUB_TRUSTED_PROXIES") {
            Ok(list) => parse_proxy_list(&list)?,
            Err(_) => Vec::new(),
        };

        let config = Self {
            host: env::var("CHAT_HUB_HOST").unwrap_or(defaults.host),
            port: env_or("CHAT_HUB_PORT", defaults.port),
            allowed_origin: env::var("CHAT_HUB_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            static_dir: env::var("CHAT_HUB_STATIC_DIR").unwrap_or(defaults.static_dir),
            message_prefix: env::var("CHAT_HUB_MESSAGE_PREFIX").unwrap_or(defaults.message_prefix),
            rate_limit_permits: env_or("CHAT_HUB_RATE_LIMIT_PERMITS", defaults.rate_limit_permits),
            rate_limit_window: Duration::from_secs(env_or(
                "CHAT_HUB_RATE_LIMIT_WINDOW_SECS",
                DEFAULT_RATE_WINDOW_SECS,
            )),
            rate_limit_max_keys: env_or("CHAT_HUB_RATE_LIMIT_MAX_KEYS", defaults.rate_limit_max_keys),
            sweep_interval: Duration::from_secs(env_or(
                "CHAT_HUB_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            outbound_buffer: env_or("CHAT_HUB_OUTBOUND_BUFFER", defaults.outbound_buffer),
            send_timeout: Duration::from_millis(env_or(
                "CHAT_HUB_SEND_TIMEOUT_MS",
                DEFAULT_SEND_TIMEOUT_MS,
            )),
            max_message_size: env_or("CHAT_HUB_MAX_MESSAGE_SIZE", defaults.max_message_size),
            trust_proxy_headers: env_flag("CHAT_HUB_TRUST_PROXY_HEADERS"),
            trusted_proxies,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        let origin = Url::parse(&self.allowed_origin).map_err(|e| {
            HubError::ConfigError(format!(
                "Allowed origin '{}' is not a valid URL: {}",
                self.allowed_origin, e
            ))
        })?;
        if origin.scheme() != "http" && origin.scheme() != "https" {
            return Err(HubError::ConfigError(format!(
                "Allowed origin must use http or https, got '{}'",
                origin.scheme()
            )));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(HubError::ConfigError(format!(
                "Allowed origin '{}' must not carry a path or query",
                self.allowed_origin
            )));
        }

        if self.rate_limit_permits == 0 {
            return Err(HubError::ConfigError(
                "Rate limit permits must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit_window.is_zero() {
            return Err(HubError::ConfigError(
                "Rate limit window must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(HubError::ConfigError(
                "Sweep interval must be greater than zero".to_string(),
            ));
        }
        if self.outbound_buffer == 0 {
            return Err(HubError::ConfigError(
                "Outbound buffer must hold at least one message".to_string(),
            ));
        }
        if self.trust_proxy_headers && self.trusted_proxies.is_empty() {
            warn!("Proxy headers are trusted but no trusted proxies are configured");
        }

        Ok(())
    }

    /// Allowed origin in `scheme://host[:port]` form, as CORS compares it
    pub fn cors_origin(&self) -> String {
        Url::parse(&self.allowed_origin)
            .map(|url| url.origin().ascii_serialization())
            .unwrap_or_else(|_| self.allowed_origin.clone())
    }

    /// Address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_proxy_list(list: &str) -> Result<Vec<IpAddr>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>().map_err(|_| {
                HubError::ConfigError(format!("Invalid trusted proxy address: {}", s))
            })
        })
        .collect()
}
