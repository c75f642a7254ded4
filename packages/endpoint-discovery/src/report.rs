//! Run report handed to whatever persists or prints results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::ledger::{DiscoveryState, StopReason};
use crate::types::candidate::Method;
use crate::types::probe::{ProbeOutcome, ProbeStatus};

/// One `(method, path, status)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointRecord {
    pub method: Method,
    pub path: String,
    pub status: ProbeStatus,
}

/// Summary of a discovery run.
///
/// A run that confirms nothing is still a valid report.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub total_tested: usize,
    pub confirmed: Vec<EndpointRecord>,
    pub failed: Vec<EndpointRecord>,

    /// Counts keyed by `2xx`..`5xx`, `other`, `error`, `timeout`
    pub status_buckets: BTreeMap<String, usize>,
    pub outcomes: BTreeMap<ProbeOutcome, usize>,

    pub deepest_depth: usize,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DiscoveryReport {
    /// Snapshot the ledger in `state`. Lists are sorted by path, then method.
    pub fn from_state(state: &DiscoveryState, stop_reason: StopReason, started_at: DateTime<Utc>) -> Self {
        let mut confirmed = Vec::new();
        let mut failed = Vec::new();
        let mut status_buckets: BTreeMap<String, usize> = BTreeMap::new();
        let mut outcomes: BTreeMap<ProbeOutcome, usize> = BTreeMap::new();
        let mut deepest_depth = 0;

        let entries = state.ledger().entries();
        for entry in &entries {
            let result = &entry.result;
            *status_buckets.entry(result.status.bucket().to_string()).or_default() += 1;
            *outcomes.entry(result.outcome()).or_default() += 1;
            deepest_depth = deepest_depth.max(result.candidate.source_depth());

            let record = EndpointRecord {
                method: result.candidate.method(),
                path: result.candidate.path().to_string(),
                status: result.status,
            };
            if entry.confirmed {
                confirmed.push(record);
            } else {
                failed.push(record);
            }
        }

        confirmed.sort_by(|a, b| (&a.path, a.method).cmp(&(&b.path, b.method)));
        failed.sort_by(|a, b| (&a.path, a.method).cmp(&(&b.path, b.method)));

        Self {
            total_tested: entries.len(),
            confirmed,
            failed,
            status_buckets,
            outcomes,
            deepest_depth,
            stop_reason,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn has_confirmed(&self) -> bool {
        !self.confirmed.is_empty()
    }

    pub fn outcome_count(&self, outcome: ProbeOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tested {}, confirmed {}, failed {}, deepest depth {}, stopped: {:?}",
            self.total_tested,
            self.confirmed.len(),
            self.failed.len(),
            self.deepest_depth,
            self.stop_reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::candidate::Candidate;
    use crate::types::probe::ProbeResult;

    fn report(state: &DiscoveryState) -> DiscoveryReport {
        DiscoveryReport::from_state(state, StopReason::Exhausted, Utc::now())
    }

    #[test]
    fn test_zero_confirmed_is_valid() {
        let state = DiscoveryState::unbounded();
        state.ledger().record(ProbeResult::timeout(Candidate::get("/api/x")));

        let report = report(&state);

        assert_eq!(report.total_tested, 1);
        assert_eq!(report.confirmed_count(), 0);
        assert!(!report.has_confirmed());
        assert_eq!(report.failed[0].status, ProbeStatus::Timeout);
    }

    #[test]
    fn test_sorted_by_path_then_method() {
        let state = DiscoveryState::unbounded();
        for (method, path) in [
            (Method::Post, "/api/b"),
            (Method::Get, "/api/b"),
            (Method::Get, "/api/a"),
        ] {
            state.ledger().record(ProbeResult::from_response(
                Candidate::new(method, path, 0),
                200,
                "{}".to_string(),
                None,
                false,
            ));
        }

        let report = report(&state);
        let keys: Vec<String> = report
            .confirmed
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect();
        assert_eq!(keys, vec!["GET /api/a", "GET /api/b", "POST /api/b"]);
    }

    #[test]
    fn test_buckets_and_outcomes() {
        let state = DiscoveryState::unbounded();
        let ledger = state.ledger();
        ledger.record(ProbeResult::from_response(Candidate::get("/a"), 200, "[]".into(), None, false));
        ledger.record(ProbeResult::from_response(Candidate::get("/b"), 200, "<html>".into(), None, false));
        ledger.record(ProbeResult::from_response(Candidate::get("/c"), 403, String::new(), None, false));
        ledger.record(ProbeResult::from_response(Candidate::new(Method::Get, "/d/1", 1), 404, String::new(), None, false));
        ledger.record(ProbeResult::error(Candidate::get("/e"), "refused"));

        let report = report(&state);

        assert_eq!(report.status_buckets.get("2xx"), Some(&2));
        assert_eq!(report.status_buckets.get("4xx"), Some(&2));
        assert_eq!(report.status_buckets.get("error"), Some(&1));
        assert_eq!(report.outcome_count(ProbeOutcome::MisleadingSuccess), 1);
        assert_eq!(report.outcome_count(ProbeOutcome::AuthFailure), 1);
        assert_eq!(report.outcome_count(ProbeOutcome::Timeout), 0);
        assert_eq!(report.deepest_depth, 1);
    }

    #[test]
    fn test_serializes_statuses() {
        let state = DiscoveryState::unbounded();
        state.ledger().record(ProbeResult::timeout(Candidate::get("/t")));
        state.ledger().record(ProbeResult::error(Candidate::get("/e"), "dns"));
        state.ledger().record(ProbeResult::from_response(Candidate::get("/ok"), 200, "{}".into(), None, false));

        let json = serde_json::to_value(report(&state)).unwrap();

        assert_eq!(json["total_tested"], 3);
        assert_eq!(json["confirmed"][0]["status"], 200);
        assert_eq!(json["confirmed"][0]["method"], "GET");
        assert_eq!(json["failed"][0]["status"], "ERROR");
        assert_eq!(json["failed"][1]["status"], "TIMEOUT");
        assert_eq!(json["stop_reason"], "exhausted");
        assert_eq!(json["outcomes"]["confirmed"], 1);
    }
}
