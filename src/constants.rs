// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const WS_PATH: &str = "chathub";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const ROOT_GREETING: &str = "Hello World!";

// Broadcast constants
pub const DEFAULT_MESSAGE_PREFIX: &str = "Message from the server";
pub const RECEIVE_MESSAGE_EVENT: &str = "ReceiveMessage";
pub const RATE_LIMITED_EVENT: &str = "RateLimited";
pub const RATE_LIMITED_NOTICE: &str = "Too many messages. Please try again later.";
pub const HTTP_RATE_LIMITED_BODY: &str = "Too many requests. Please try again later.";
pub const UNKNOWN_SOURCE_KEY: &str = "unknown";

// Rate limiter constants
pub const DEFAULT_PERMIT_LIMIT: u32 = 10;
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;
pub const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

// Connection constants
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;
