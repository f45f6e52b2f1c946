//! Security headers for HTTP responses
//!
//! Applied to the greeting, health and static routes with
//! `warp::reply::with::headers`.

use warp::http::header::{HeaderMap, HeaderValue};

/// Content Security Policy for the bundled frontend, which needs the chat socket
const FRONTEND_CSP: &str = "default-src 'self'; script-src 'self'; style-src 'self'; img-src 'self' data:; connect-src 'self' ws: wss:; object-src 'none'; frame-ancestors 'none'; base-uri 'self';";

/// Headers added to every HTTP reply
pub fn security_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    // Prevent clickjacking
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));

    // Prevent MIME type sniffing
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));

    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert("Content-Security-Policy", HeaderValue::from_static(FRONTEND_CSP));

    headers
}
