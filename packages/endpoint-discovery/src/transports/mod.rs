//! Transport implementations.
//!
//! - `HttpTransport` - reqwest-backed HTTP
//! - `RateLimitedTransport` - wrapper that paces individual requests

pub mod http;
pub mod rate_limited;

pub use http::HttpTransport;
pub use rate_limited::{RateLimitedTransport, TransportExt};
