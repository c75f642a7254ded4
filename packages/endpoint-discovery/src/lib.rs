//! Combinatorial REST Endpoint Discovery
//!
//! Maps the surface of an undocumented HTTP API by synthesizing candidate
//! paths, probing them under a concurrency and rate budget, and recursing
//! into collections that turn out to exist.
//!
//! # Pipeline
//!
//! ```text
//! PatternGenerator -> BatchScheduler -> ProbeExecutor (fan-out)
//!        ^                                    |
//!        |                                    v
//! RecursiveExpander <------------------ DiscoveryLedger (fan-in)
//! ```
//!
//! A response counts as a confirmed endpoint only if its status is in
//! `[200, 400)` and its body is not an HTML page. Login redirects and SPA
//! fallbacks that answer `200` with HTML are recorded as misleading
//! successes, not endpoints.
//!
//! # Usage
//!
//! ```rust,ignore
//! use endpoint_discovery::{AuthHeaders, DiscoveryConfig, EndpointDiscovery};
//!
//! let config = DiscoveryConfig::new("https://app.example.com")
//!     .with_auth_headers(AuthHeaders::new().with_bearer_token(token))
//!     .with_resource_stems(["project", "execution", "testsuite"])
//!     .with_prefixes(["/api", "/api/v1", ""])
//!     .with_max_depth(1);
//!
//! let report = EndpointDiscovery::http(config)?.run().await;
//! for endpoint in &report.confirmed {
//!     println!("{} {} -> {}", endpoint.method, endpoint.path, endpoint.status);
//! }
//! ```
//!
//! # Modules
//!
//! - [`generator`] - Candidate path synthesis
//! - [`probe`] - Single-request probing and classification
//! - [`scheduler`] - Batched, bounded-concurrency sweeps
//! - [`ledger`] - Concurrent result ledger and run state
//! - [`expander`] - ID extraction from confirmed collections
//! - [`transports`] - HTTP and rate-limited transports
//! - [`testing`] - Mock transport for tests

pub mod discovery;
pub mod error;
pub mod expander;
pub mod generator;
pub mod ledger;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod security;
pub mod testing;
pub mod traits;
pub mod transports;
pub mod types;

// Re-export core types at crate root
pub use discovery::{paced_transport, EndpointDiscovery};
pub use error::{DiscoveryError, TransportError};
pub use expander::RecursiveExpander;
pub use generator::PatternGenerator;
pub use ledger::{DiscoveryLedger, DiscoveryState, LedgerEntry, StopReason};
pub use probe::ProbeExecutor;
pub use report::{DiscoveryReport, EndpointRecord};
pub use scheduler::{BatchScheduler, SweepOutcome};
pub use security::{AuthHeaders, SecretString};
pub use traits::transport::{Transport, TransportRequest, TransportResponse};
pub use transports::{HttpTransport, RateLimitedTransport, TransportExt};
pub use types::{
    candidate::{Candidate, EndpointKey, Method},
    config::{DiscoveryConfig, ExpansionLimits},
    probe::{BodyKind, ProbeOutcome, ProbeResult, ProbeStatus},
};

// Re-export testing utilities
pub use testing::{MockTransport, MockTransportCall};
