//! Transport trait: the seam to whatever actually speaks HTTP.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::TransportResult;
use crate::security::AuthHeaders;
use crate::types::candidate::Method;

/// One outgoing request.
#[derive(Debug, Clone, Copy)]
pub struct TransportRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: &'a AuthHeaders,
    pub timeout: Duration,
    /// Body bytes to keep; the rest is not read
    pub max_body_bytes: usize,
}

/// What came back from the wire.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// The body was cut at `max_body_bytes`
    pub truncated: bool,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            truncated: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Sends a single HTTP request.
///
/// Implementations never construct retries; the prober calls `send` exactly
/// once per candidate.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait until the transport may send another request.
    ///
    /// Callers await this before starting the request timeout, so time
    /// spent queued for pacing never counts as a timed-out request.
    async fn ready(&self) {}

    async fn send(&self, request: TransportRequest<'_>) -> TransportResult<TransportResponse>;

    /// Name of this transport (for logging).
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn ready(&self) {
        (**self).ready().await
    }

    async fn send(&self, request: TransportRequest<'_>) -> TransportResult<TransportResponse> {
        (**self).send(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
