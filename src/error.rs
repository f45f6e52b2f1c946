use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum HubError {
    // Registry errors
    DuplicateId(String),

    // Admission errors
    RateLimited,

    // Delivery errors
    DeliveryFailure(String),
    ConnectionClosed,

    // Messages errors
    MessageParseError(String),
    MessageTooLarge(usize),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "Connection id already registered: {}", id),
            Self::RateLimited => write!(f, "Rate limit exceeded, try again later"),
            Self::DeliveryFailure(msg) => write!(f, "Delivery failure: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for HubError {}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::MessageParseError(err.to_string())
    }
}

// Generic result type for the chat hub
pub type Result<T> = std::result::Result<T, HubError>;
