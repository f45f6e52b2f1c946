use serde::{Deserialize, Serialize};

use crate::constants::{RATE_LIMITED_EVENT, RATE_LIMITED_NOTICE};
use crate::security::xss::encode_html;

/// Chat message as sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub user: String,
    pub message: String,
    #[serde(rename = "dateTime", default)]
    pub date_time: String,
}

impl InboundMessage {
    pub fn new(
        user: impl Into<String>,
        message: impl Into<String>,
        date_time: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            message: message.into(),
            date_time: date_time.into(),
        }
    }
}

/// Sanitized message ready for fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub prefix: String,
    pub user: String,
    pub message: String,
    pub date_time: String,
}

impl OutboundMessage {
    /// Build the broadcast form of an inbound message. The prefix is always the
    /// server's own; client fields are entity-encoded and otherwise untouched.
    pub fn from_inbound(prefix: &str, inbound: &InboundMessage) -> Self {
        Self {
            prefix: prefix.to_string(),
            user: encode_html(&inbound.user),
            message: encode_html(&inbound.message),
            date_time: encode_html(&inbound.date_time),
        }
    }

    pub fn fields(&self) -> (&str, &str, &str, &str) {
        (&self.prefix, &self.user, &self.message, &self.date_time)
    }
}

/// Named event pushed to a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    pub name: String,
    pub message: OutboundMessage,
}

#[derive(Serialize)]
struct WireEvent<'a> {
    event: &'a str,
    args: Vec<&'a str>,
}

impl OutboundEvent {
    pub fn new(name: impl Into<String>, message: OutboundMessage) -> Self {
        Self {
            name: name.into(),
            message,
        }
    }

    /// Wire form: `{"event": name, "args": [prefix, user, message, dateTime]}`
    pub fn to_json(&self) -> serde_json::Result<String> {
        let (prefix, user, message, date_time) = self.message.fields();
        serde_json::to_string(&WireEvent {
            event: &self.name,
            args: vec![prefix, user, message, date_time],
        })
    }
}

/// Notice sent only to a sender whose message was rejected by the limiter
pub fn rate_limited_notice() -> serde_json::Result<String> {
    serde_json::to_string(&WireEvent {
        event: RATE_LIMITED_EVENT,
        args: vec![RATE_LIMITED_NOTICE],
    })
}
