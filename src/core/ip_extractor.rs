//! Source key extraction for rate limiting
//!
//! The source key is the client IP as a string. Proxy headers are only
//! honored when the direct peer is an explicitly trusted proxy.

use log::{debug, warn};
use std::net::{IpAddr, SocketAddr};
use warp::http::HeaderMap;

use crate::config::ServerConfig;
use crate::constants::UNKNOWN_SOURCE_KEY;

/// Configuration for source key extraction
#[derive(Debug, Clone, Default)]
pub struct IpExtractionConfig {
    /// Whether to trust proxy headers (X-Forwarded-For, X-Real-IP)
    pub trust_proxy_headers: bool,
    pub trusted_proxies: Vec<IpAddr>,
}

impl IpExtractionConfig {
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            trust_proxy_headers: config.trust_proxy_headers,
            trusted_proxies: config.trusted_proxies.clone(),
        }
    }
}

/// Derive the rate-limit source key for a request
pub fn extract_source_key(
    headers: &HeaderMap,
    remote_addr: Option<SocketAddr>,
    config: &IpExtractionConfig,
) -> String {
    let direct_ip = remote_addr.map(|addr| addr.ip());

    let behind_trusted_proxy = config.trust_proxy_headers
        && direct_ip.map_or(false, |ip| config.trusted_proxies.contains(&ip));

    if behind_trusted_proxy {
        if let Some(ip) = forwarded_ip(headers) {
            debug!("Using forwarded client IP {}", ip);
            return ip.to_string();
        }
        warn!("Could not extract valid client IP from proxy headers, using proxy IP");
    }

    match direct_ip {
        Some(ip) => ip.to_string(),
        None => UNKNOWN_SOURCE_KEY.to_string(),
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // X-Forwarded-For can contain multiple IPs: "client, proxy1, proxy2"
    let from_forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| parse_ip(first.trim(), "X-Forwarded-For"));

    from_forwarded_for.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_ip(value.trim(), "X-Real-IP"))
    })
}

fn parse_ip(value: &str, header: &str) -> Option<IpAddr> {
    match value.parse::<IpAddr>() {
        Ok(ip) => Some(ip),
        Err(_) => {
            warn!("Invalid IP format in {} header: {}", header, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::http::HeaderValue;

    fn proxy_config() -> IpExtractionConfig {
        IpExtractionConfig {
            trust_proxy_headers: true,
            trusted_proxies: vec!["203.0.113.100".parse().unwrap()],
        }
    }

    #[test]
    fn test_direct_ip() {
        let key = extract_source_key(
            &HeaderMap::new(),
            Some("203.0.113.1:12345".parse().unwrap()),
            &IpExtractionConfig::default(),
        );
        assert_eq!(key, "203.0.113.1");
    }

    #[test]
    fn test_unknown_without_remote_addr() {
        let key = extract_source_key(&HeaderMap::new(), None, &IpExtractionConfig::default());
        assert_eq!(key, "unknown");
    }

    #[test]
    fn test_forwarded_for_from_trusted_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7, 203.0.113.100"));

        let key = extract_source_key(
            &headers,
            Some("203.0.113.100:443".parse().unwrap()),
            &proxy_config(),
        );
        assert_eq!(key, "198.51.100.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.8"));

        let key = extract_source_key(
            &headers,
            Some("203.0.113.100:443".parse().unwrap()),
            &proxy_config(),
        );
        assert_eq!(key, "198.51.100.8");
    }

    #[test]
    fn test_headers_ignored_from_untrusted_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7"));

        let key = extract_source_key(
            &headers,
            Some("192.0.2.50:5555".parse().unwrap()),
            &proxy_config(),
        );
        assert_eq!(key, "192.0.2.50");
    }
}
