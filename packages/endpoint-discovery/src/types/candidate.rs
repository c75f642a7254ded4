//! Candidate endpoints produced by the pattern generator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP verbs the prober knows how to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger key: one `(method, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EndpointKey {
    pub method: Method,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A hypothetical endpoint that has not been probed yet.
///
/// Candidates are immutable once generated; the scheduler consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Candidate {
    method: Method,
    path: String,
    source_depth: usize,
}

impl Candidate {
    pub fn new(method: Method, path: impl Into<String>, source_depth: usize) -> Self {
        Self {
            method,
            path: path.into(),
            source_depth,
        }
    }

    /// Shorthand for a depth-0 GET candidate.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, 0)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of expansion hops from a configured resource.
    pub fn source_depth(&self) -> usize {
        self.source_depth
    }

    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(self.method, self.path.clone())
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
