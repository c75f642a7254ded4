//! Typed errors for the discovery library.
//!
//! Probe-level failures never surface as errors: the probe executor folds
//! them into a [`ProbeStatus`](crate::types::probe::ProbeStatus). The only
//! errors a caller sees are construction-time problems.

use thiserror::Error;

/// Errors raised while setting up a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Configuration failed validation
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Base URL could not be parsed
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// Rate limiter could not be built from the configured quota
    #[error("rate limit error: {reason}")]
    RateLimit { reason: String },

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl DiscoveryError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Errors returned by a [`Transport`](crate::traits::transport::Transport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within its timeout
    #[error("request timed out")]
    Timeout,

    /// DNS, connection refused, TLS handshake
    #[error("connection failed: {0}")]
    Connect(String),

    /// Request was sent but the exchange failed (reading the body, protocol error)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request could not be built (bad header, bad URL)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for discovery setup.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
