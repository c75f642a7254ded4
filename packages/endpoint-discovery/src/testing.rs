//! Testing utilities including a mock transport.
//!
//! Lets applications and tests drive a full discovery run without making
//! network calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{TransportError, TransportResult};
use crate::traits::transport::{Transport, TransportRequest, TransportResponse};
use crate::types::candidate::Method;

/// Record of a call made to the mock transport.
#[derive(Debug, Clone)]
pub struct MockTransportCall {
    pub method: Method,
    pub url: String,
    pub header_names: Vec<String>,
    pub max_body_bytes: usize,
    /// tokio clock, so paused-time tests see virtual instants
    pub at: tokio::time::Instant,
}

/// A mock transport for testing.
///
/// Returns predefined responses by `(method, url)` and `404` with an empty
/// body for everything else.
#[derive(Default)]
pub struct MockTransport {
    responses: Arc<RwLock<HashMap<(Method, String), TransportResponse>>>,

    /// URLs that fail with a connection error
    fail_urls: Arc<RwLock<Vec<String>>>,

    /// URLs whose transport reports a timeout
    timeout_urls: Arc<RwLock<Vec<String>>>,

    /// Artificial latency per URL
    delays: Arc<RwLock<HashMap<String, Duration>>>,

    default_latency: Option<Duration>,

    calls: Arc<RwLock<Vec<MockTransportCall>>>,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predefined response for `(method, url)`.
    pub fn with_response(self, method: Method, url: impl Into<String>, response: TransportResponse) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert((method, url.into()), response);
        self
    }

    /// Add a GET response with a JSON content type.
    pub fn with_json(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let response =
            TransportResponse::new(status, body).with_header("Content-Type", "application/json");
        self.with_response(Method::Get, url, response)
    }

    /// Add a GET response with an HTML content type.
    pub fn with_html(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let response = TransportResponse::new(status, body).with_header("Content-Type", "text/html");
        self.with_response(Method::Get, url, response)
    }

    /// Mark a URL as failing with a connection error.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.write().unwrap().push(url.into());
        self
    }

    /// Mark a URL as timing out at the transport level.
    pub fn timeout_url(self, url: impl Into<String>) -> Self {
        self.timeout_urls.write().unwrap().push(url.into());
        self
    }

    /// Delay responses for a URL.
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(url.into(), delay);
        self
    }

    /// Delay every response that has no URL-specific delay.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = Some(latency);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockTransportCall> {
        self.calls.read().unwrap().clone()
    }

    /// URLs requested, in call order.
    pub fn called_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }

    /// Highest number of requests observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the caller drops the future.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest<'_>) -> TransportResult<TransportResponse> {
        let url = request.url.to_string();
        self.calls.write().unwrap().push(MockTransportCall {
            method: request.method,
            url: url.clone(),
            header_names: request.headers.names().into_iter().map(String::from).collect(),
            max_body_bytes: request.max_body_bytes,
            at: tokio::time::Instant::now(),
        });

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        let guard = InFlightGuard(&self.in_flight);

        let delay = self
            .delays
            .read()
            .unwrap()
            .get(&url)
            .copied()
            .or(self.default_latency);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        drop(guard);

        if self.fail_urls.read().unwrap().contains(&url) {
            return Err(TransportError::Connect("Mock connection refused".to_string()));
        }
        if self.timeout_urls.read().unwrap().contains(&url) {
            return Err(TransportError::Timeout);
        }

        Ok(self
            .responses
            .read()
            .unwrap()
            .get(&(request.method, url))
            .cloned()
            .unwrap_or_else(|| TransportResponse::new(404, "")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
