//! Probe results and their classification.

use serde::{Serialize, Serializer};
use std::fmt;

use super::candidate::{Candidate, EndpointKey};

/// What a probe observed.
///
/// Serializes as the HTTP status code, `"ERROR"` or `"TIMEOUT"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStatus {
    Http(u16),
    Error,
    Timeout,
}

impl ProbeStatus {
    pub fn code(&self) -> Option<u16> {
        match self {
            ProbeStatus::Http(code) => Some(*code),
            _ => None,
        }
    }

    /// Status in `[200, 400)`.
    pub fn is_success_range(&self) -> bool {
        matches!(self, ProbeStatus::Http(code) if (200..400).contains(code))
    }

    /// Report bucket: `2xx`..`5xx`, `other`, `error` or `timeout`.
    pub fn bucket(&self) -> &'static str {
        match self {
            ProbeStatus::Http(code) => match code / 100 {
                2 => "2xx",
                3 => "3xx",
                4 => "4xx",
                5 => "5xx",
                _ => "other",
            },
            ProbeStatus::Error => "error",
            ProbeStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Http(code) => write!(f, "{}", code),
            ProbeStatus::Error => f.write_str("ERROR"),
            ProbeStatus::Timeout => f.write_str("TIMEOUT"),
        }
    }
}

impl Serialize for ProbeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProbeStatus::Http(code) => serializer.serialize_u16(*code),
            ProbeStatus::Error => serializer.serialize_str("ERROR"),
            ProbeStatus::Timeout => serializer.serialize_str("TIMEOUT"),
        }
    }
}

/// Shape of a response body, judged from its content rather than headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Empty,
    Html,
    Json,
    Other,
}

impl BodyKind {
    pub fn classify(body: &str) -> Self {
        let trimmed = body.trim_start_matches('\u{feff}').trim_start();
        if trimmed.is_empty() {
            BodyKind::Empty
        } else if is_html_shaped(trimmed) {
            BodyKind::Html
        } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
            BodyKind::Json
        } else {
            BodyKind::Other
        }
    }
}

/// Login pages and routing errors often come back as `200` with HTML.
pub fn is_html_shaped(body: &str) -> bool {
    let trimmed = body.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with('<') || trimmed.to_ascii_lowercase().contains("<!doctype")
}

/// Failure taxonomy for a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Confirmed,
    /// 401 or 403
    AuthFailure,
    /// Success-range status with an HTML body
    MisleadingSuccess,
    NotFound,
    HttpError,
    TransportError,
    Timeout,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Confirmed => "confirmed",
            ProbeOutcome::AuthFailure => "auth_failure",
            ProbeOutcome::MisleadingSuccess => "misleading_success",
            ProbeOutcome::NotFound => "not_found",
            ProbeOutcome::HttpError => "http_error",
            ProbeOutcome::TransportError => "transport_error",
            ProbeOutcome::Timeout => "timeout",
        }
    }
}

/// The outcome of probing one candidate. Created once per probe attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub candidate: Candidate,
    pub status: ProbeStatus,
    pub body_sample: Option<String>,
    pub content_type: Option<String>,
    /// Underlying transport message for `ERROR` results
    pub error: Option<String>,
    /// Body was cut at the configured sample limit
    pub truncated: bool,
}

impl ProbeResult {
    pub fn from_response(
        candidate: Candidate,
        status: u16,
        body_sample: String,
        content_type: Option<String>,
        truncated: bool,
    ) -> Self {
        Self {
            candidate,
            status: ProbeStatus::Http(status),
            body_sample: Some(body_sample),
            content_type,
            error: None,
            truncated,
        }
    }

    pub fn timeout(candidate: Candidate) -> Self {
        Self {
            candidate,
            status: ProbeStatus::Timeout,
            body_sample: None,
            content_type: None,
            error: None,
            truncated: false,
        }
    }

    pub fn error(candidate: Candidate, message: impl Into<String>) -> Self {
        Self {
            candidate,
            status: ProbeStatus::Error,
            body_sample: None,
            content_type: None,
            error: Some(message.into()),
            truncated: false,
        }
    }

    pub fn key(&self) -> EndpointKey {
        self.candidate.key()
    }

    pub fn body_kind(&self) -> BodyKind {
        self.body_sample
            .as_deref()
            .map(BodyKind::classify)
            .unwrap_or(BodyKind::Empty)
    }

    /// Status in `[200, 400)` and the body is not HTML.
    pub fn is_confirmed(&self) -> bool {
        self.status.is_success_range() && self.body_kind() != BodyKind::Html
    }

    pub fn outcome(&self) -> ProbeOutcome {
        match self.status {
            ProbeStatus::Timeout => ProbeOutcome::Timeout,
            ProbeStatus::Error => ProbeOutcome::TransportError,
            ProbeStatus::Http(401) | ProbeStatus::Http(403) => ProbeOutcome::AuthFailure,
            ProbeStatus::Http(404) => ProbeOutcome::NotFound,
            status if status.is_success_range() => {
                if self.body_kind() == BodyKind::Html {
                    ProbeOutcome::MisleadingSuccess
                } else {
                    ProbeOutcome::Confirmed
                }
            }
            ProbeStatus::Http(_) => ProbeOutcome::HttpError,
        }
    }
}
