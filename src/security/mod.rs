//! Security utilities for broadcast content and HTTP replies

pub mod headers;
pub mod xss;

pub use headers::security_headers;
pub use xss::encode_html;
