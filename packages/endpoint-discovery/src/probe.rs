//! Probe executor: one bounded-timeout request per candidate.
//!
//! Every failure mode is folded into the returned [`ProbeResult`]; nothing
//! raised by the transport escapes `probe()`.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::security::AuthHeaders;
use crate::traits::transport::{Transport, TransportRequest};
use crate::types::candidate::Candidate;
use crate::types::config::DiscoveryConfig;
use crate::types::probe::ProbeResult;

pub struct ProbeExecutor<T: Transport> {
    transport: T,
    base_url: String,
    headers: AuthHeaders,
    timeout: Duration,
    max_body_bytes: usize,
}

impl<T: Transport> ProbeExecutor<T> {
    pub fn new(transport: T, base_url: impl Into<String>, headers: AuthHeaders) -> Self {
        let defaults = DiscoveryConfig::default();
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
            timeout: defaults.timeout(),
            max_body_bytes: defaults.max_body_bytes,
        }
    }

    pub fn from_config(transport: T, config: &DiscoveryConfig) -> Self {
        Self::new(transport, config.base_url.clone(), config.auth_headers.clone())
            .with_timeout(config.timeout())
            .with_max_body_bytes(config.max_body_bytes)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn url_for(&self, candidate: &Candidate) -> String {
        format!("{}{}", self.base_url, candidate.path())
    }

    /// Probe a candidate exactly once. Never retries, never errors.
    pub async fn probe(&self, candidate: Candidate) -> ProbeResult {
        let url = self.url_for(&candidate);
        let request = TransportRequest {
            method: candidate.method(),
            url: &url,
            headers: &self.headers,
            timeout: self.timeout,
            max_body_bytes: self.max_body_bytes,
        };

        // Pacing waits are not part of the request, so they sit outside the timeout
        self.transport.ready().await;

        // The transport gets the timeout too, but it is enforced here regardless
        let outcome = tokio::time::timeout(self.timeout, self.transport.send(request)).await;

        let result = match outcome {
            Err(_) | Ok(Err(TransportError::Timeout)) => {
                warn!(method = %candidate.method(), path = %candidate.path(), "Probe timed out");
                ProbeResult::timeout(candidate)
            }
            Ok(Err(e)) => {
                warn!(method = %candidate.method(), path = %candidate.path(), error = %e, "Probe transport failure");
                ProbeResult::error(candidate, e.to_string())
            }
            Ok(Ok(response)) => {
                let content_type = response.content_type().map(String::from);
                let (body, cut) = truncate_body(response.body, self.max_body_bytes);
                let truncated = cut || response.truncated;
                ProbeResult::from_response(candidate, response.status, body, content_type, truncated)
            }
        };

        debug!(
            method = %result.candidate.method(),
            path = %result.candidate.path(),
            status = %result.status,
            outcome = result.outcome().as_str(),
            "Probe complete"
        );

        result
    }
}

/// Cut `body` to at most `max` bytes on a char boundary.
fn truncate_body(mut body: String, max: usize) -> (String, bool) {
    if body.len() <= max {
        return (body, false);
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body.truncate(end);
    (body, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::traits::transport::TransportResponse;
    use crate::transports::TransportExt;
    use crate::types::candidate::Method;
    use crate::types::probe::{ProbeOutcome, ProbeStatus};
    use futures::future::join_all;

    const BASE: &str = "https://api.example.com";

    fn executor(transport: MockTransport) -> ProbeExecutor<MockTransport> {
        ProbeExecutor::new(transport, format!("{}/", BASE), AuthHeaders::new().with_bearer_token("t"))
            .with_timeout(Duration::from_secs(3))
    }

    #[tokio::test]
    async fn test_confirmed_json() {
        let probe = executor(MockTransport::new().with_json(
            "https://api.example.com/api/projects",
            200,
            r#"[{"id":7}]"#,
        ));

        let result = probe.probe(Candidate::get("/api/projects")).await;

        assert_eq!(result.status, ProbeStatus::Http(200));
        assert!(result.is_confirmed());
        assert_eq!(result.content_type.as_deref(), Some("application/json"));
        assert_eq!(result.body_sample.as_deref(), Some(r#"[{"id":7}]"#));
    }

    #[tokio::test]
    async fn test_html_login_page_not_confirmed() {
        let probe = executor(MockTransport::new().with_html(
            "https://api.example.com/api/projects",
            200,
            "<!DOCTYPE html><html><body>Sign in</body></html>",
        ));

        let result = probe.probe(Candidate::get("/api/projects")).await;

        assert_eq!(result.status, ProbeStatus::Http(200));
        assert!(!result.is_confirmed());
        assert_eq!(result.outcome(), ProbeOutcome::MisleadingSuccess);
    }

    #[tokio::test]
    async fn test_auth_failure_keeps_status() {
        let probe = executor(MockTransport::new().with_json(
            "https://api.example.com/api/projects",
            401,
            r#"{"error":"unauthorized"}"#,
        ));

        let result = probe.probe(Candidate::get("/api/projects")).await;

        assert_eq!(result.status, ProbeStatus::Http(401));
        assert_eq!(result.outcome(), ProbeOutcome::AuthFailure);
    }

    #[tokio::test]
    async fn test_transport_error_becomes_error_status() {
        let probe = executor(MockTransport::new().fail_url("https://api.example.com/api/down"));

        let result = probe.probe(Candidate::get("/api/down")).await;

        assert_eq!(result.status, ProbeStatus::Error);
        assert!(result.error.as_deref().unwrap().contains("Mock connection refused"));
        assert!(!result.is_confirmed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_times_out_once() {
        let transport = MockTransport::new()
            .with_json("https://api.example.com/api/slow", 200, "[]")
            .with_delay("https://api.example.com/api/slow", Duration::from_secs(30));
        let probe = executor(transport);

        let result = probe.probe(Candidate::get("/api/slow")).await;

        assert_eq!(result.status, ProbeStatus::Timeout);
        assert!(!result.is_confirmed());
        assert_eq!(probe.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_timeout_is_timeout_status() {
        let probe = executor(MockTransport::new().timeout_url("https://api.example.com/api/t"));

        let result = probe.probe(Candidate::get("/api/t")).await;

        assert_eq!(result.status, ProbeStatus::Timeout);
        assert_eq!(probe.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_headers_forwarded() {
        let probe = executor(MockTransport::new());
        probe.probe(Candidate::get("/api/x")).await;

        let calls = probe.transport().calls();
        assert_eq!(calls[0].url, "https://api.example.com/api/x");
        assert_eq!(calls[0].header_names, vec!["Authorization".to_string()]);
    }

    #[test]
    fn test_truncate_body_on_char_boundary() {
        let (body, truncated) = truncate_body("héllo".to_string(), 2);
        assert_eq!(body, "h");
        assert!(truncated);

        let (body, truncated) = truncate_body("short".to_string(), 64);
        assert_eq!(body, "short");
        assert!(!truncated);
    }

    #[tokio::test]
    async fn test_queued_for_rate_limit_is_not_a_timeout() {
        // Eight requests at four per second with a 300ms timeout: the second
        // half waits up to a second for a permit but each request is fast.
        let transport = MockTransport::new().rate_limited(4).unwrap();
        let probe = ProbeExecutor::new(transport, BASE, AuthHeaders::new())
            .with_timeout(Duration::from_millis(300));

        let candidates = (0..8).map(|n| Candidate::get(format!("/api/seed{}", n)));
        let results = join_all(candidates.map(|c| probe.probe(c))).await;

        assert!(results.iter().all(|r| r.status == ProbeStatus::Http(404)));
        assert_eq!(probe.transport().inner().calls().len(), 8);
    }

    #[tokio::test]
    async fn test_limit_reaches_transport_and_truncation_is_kept() {
        let transport = MockTransport::new().with_response(
            Method::Get,
            "https://api.example.com/api/big",
            TransportResponse {
                truncated: true,
                ..TransportResponse::new(200, r#"[{"id":1}"#)
            },
        );
        let probe = executor(transport).with_max_body_bytes(9);

        let result = probe.probe(Candidate::get("/api/big")).await;

        assert!(result.truncated);
        assert_eq!(probe.transport().calls()[0].max_body_bytes, 9);
    }
}
