//! Configuration for a discovery run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DiscoveryError, Result};
use crate::security::AuthHeaders;
use crate::types::candidate::Method;

/// Largest span a single `id_ranges` entry may cover.
const MAX_ID_RANGE_SPAN: u64 = 10_000;

/// Configuration for an endpoint discovery run.
///
/// Read-only once the run starts. Auth headers are never deserialized;
/// the caller attaches them with [`DiscoveryConfig::with_auth_headers`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Base URL every candidate path is appended to
    pub base_url: String,

    #[serde(skip)]
    pub auth_headers: AuthHeaders,

    /// Resource name stems; singular and plural forms are both generated
    pub resource_stems: Vec<String>,

    /// API-version path prefixes, e.g. "/api", "/api/v2", ""
    pub api_version_prefixes: Vec<String>,

    /// Numeric IDs appended as "/{id}" to every resource path
    pub known_ids: Vec<u64>,

    /// Inclusive `[start, end]` ranges expanded into known IDs
    pub id_ranges: Vec<(u64, u64)>,

    /// Explicit seed paths probed under every prefix
    pub extra_paths: Vec<String>,

    /// Child collections appended after an ID, e.g. "steps" in "/executions/{id}/steps"
    pub sub_resources: Vec<String>,

    /// Write methods to probe in addition to GET
    pub extra_methods: Vec<Method>,

    /// Expansion hops allowed from a configured resource (0 = no expansion)
    pub max_depth: usize,

    /// Probes in flight per batch
    pub batch_size: usize,

    /// Delay between batches in milliseconds
    pub request_delay_ms: u64,

    /// Per-probe timeout in milliseconds
    pub timeout_ms: u64,

    /// Stop dispatching after this many probes
    pub max_requests: Option<usize>,

    /// Stop dispatching after this much wall-clock time
    pub max_duration_ms: Option<u64>,

    /// Optional per-request pacing on top of the batch delay
    pub requests_per_second: Option<u32>,

    /// Response bodies are kept up to this many bytes
    pub max_body_bytes: usize,

    pub expansion: ExpansionLimits,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_headers: AuthHeaders::default(),
            resource_stems: vec![],
            api_version_prefixes: vec!["/api".to_string(), String::new()],
            known_ids: vec![],
            id_ranges: vec![],
            extra_paths: vec![],
            sub_resources: vec![],
            extra_methods: vec![],
            max_depth: 1,
            batch_size: 5,
            request_delay_ms: 500,
            timeout_ms: 5_000,
            max_requests: None,
            max_duration_ms: None,
            requests_per_second: None,
            max_body_bytes: 256 * 1024,
            expansion: ExpansionLimits::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a config for a base URL with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_auth_headers(mut self, headers: AuthHeaders) -> Self {
        self.auth_headers = headers;
        self
    }

    pub fn with_resource_stems(mut self, stems: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.resource_stems = stems.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn with_prefixes(mut self, prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.api_version_prefixes = prefixes.into_iter().map(|p| p.into()).collect();
        self
    }

    pub fn with_known_ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.known_ids = ids.into_iter().collect();
        self
    }

    pub fn with_id_range(mut self, start: u64, end: u64) -> Self {
        self.id_ranges.push((start, end));
        self
    }

    pub fn with_extra_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_paths = paths.into_iter().map(|p| p.into()).collect();
        self
    }

    pub fn with_sub_resources(mut self, subs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sub_resources = subs.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Enable POST/PUT/DELETE probing. GET is always probed.
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.extra_methods = methods.into_iter().collect();
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_request_delay_ms(mut self, ms: u64) -> Self {
        self.request_delay_ms = ms;
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn with_max_requests(mut self, max: usize) -> Self {
        self.max_requests = Some(max);
        self
    }

    pub fn with_max_duration_ms(mut self, ms: u64) -> Self {
        self.max_duration_ms = Some(ms);
        self
    }

    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    pub fn with_expansion(mut self, limits: ExpansionLimits) -> Self {
        self.expansion = limits;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }

    /// Known IDs plus expanded ranges, sorted and deduplicated.
    pub fn all_known_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.known_ids.clone();
        for &(start, end) in &self.id_ranges {
            ids.extend(start..=end);
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Check the config before a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(DiscoveryError::config("base_url must be set"));
        }
        let parsed = url::Url::parse(&self.base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DiscoveryError::config(format!(
                "base_url scheme must be http or https, got {}",
                parsed.scheme()
            )));
        }
        if self.batch_size == 0 {
            return Err(DiscoveryError::config("batch_size must be > 0"));
        }
        if self.timeout_ms == 0 {
            return Err(DiscoveryError::config("timeout_ms must be > 0"));
        }
        if self.resource_stems.iter().all(|s| s.trim().is_empty()) && self.extra_paths.is_empty() {
            return Err(DiscoveryError::config(
                "at least one resource stem or extra path is required",
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(DiscoveryError::config("requests_per_second must be > 0"));
        }
        for &(start, end) in &self.id_ranges {
            if start > end {
                return Err(DiscoveryError::config(format!(
                    "id range [{}, {}] is reversed",
                    start, end
                )));
            }
            if end - start >= MAX_ID_RANGE_SPAN {
                return Err(DiscoveryError::config(format!(
                    "id range [{}, {}] spans more than {} ids",
                    start, end, MAX_ID_RANGE_SPAN
                )));
            }
        }
        Ok(())
    }
}

/// Bounds on the JSON walk that extracts child IDs from a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionLimits {
    /// IDs taken from a single response
    pub max_ids_per_response: usize,

    /// Nesting depth the walk descends to
    pub max_walk_depth: usize,

    /// JSON nodes visited per response
    pub max_nodes: usize,

    /// Field names treated as identifiers
    pub id_fields: Vec<String>,

    /// Envelope fields whose name is not a path segment. IDs found under any
    /// other field also yield `{path}/{field}/{id}` children.
    pub wrapper_fields: Vec<String>,
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        Self {
            max_ids_per_response: 25,
            max_walk_depth: 8,
            max_nodes: 10_000,
            id_fields: vec!["id".to_string()],
            wrapper_fields: [
                "items", "data", "results", "records", "content", "list", "entries", "rows",
                "hits", "nodes", "edges", "values",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ExpansionLimits {
    pub fn with_max_ids(mut self, max: usize) -> Self {
        self.max_ids_per_response = max;
        self
    }

    pub fn with_max_walk_depth(mut self, depth: usize) -> Self {
        self.max_walk_depth = depth;
        self
    }

    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.max_nodes = nodes;
        self
    }

    pub fn with_id_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.id_fields = fields.into_iter().map(|f| f.into()).collect();
        self
    }

    pub fn with_wrapper_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.wrapper_fields = fields.into_iter().map(|f| f.into()).collect();
        self
    }

    /// A field name that holds a listing rather than naming a resource.
    pub fn is_wrapper_field(&self, name: &str) -> bool {
        self.wrapper_fields.iter().any(|w| w.eq_ignore_ascii_case(name))
    }
}
