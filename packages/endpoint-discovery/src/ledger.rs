//! Discovery ledger and per-run state.
//!
//! The ledger is the only state written by concurrent probes. Writes are
//! keyed by `(method, path)` and go through `DashMap` shards, so inserting
//! one key never blocks on another.

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::types::candidate::{EndpointKey, Method};
use crate::types::probe::ProbeResult;

/// Latest probe result for one key.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub result: ProbeResult,
    pub confirmed: bool,
}

impl LedgerEntry {
    pub fn new(result: ProbeResult) -> Self {
        let confirmed = result.is_confirmed();
        Self { result, confirmed }
    }
}

/// Deduplicated record of every probe outcome in a run.
#[derive(Debug, Default)]
pub struct DiscoveryLedger {
    entries: DashMap<EndpointKey, LedgerEntry>,
    tested: DashSet<EndpointKey>,
}

impl DiscoveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for the result's key.
    pub fn record(&self, result: ProbeResult) {
        let key = result.key();
        self.tested.insert(key.clone());
        self.entries.insert(key, LedgerEntry::new(result));
    }

    /// Whether `(method, path)` was claimed or recorded in this run.
    pub fn already_tested(&self, method: Method, path: &str) -> bool {
        self.tested.contains(&EndpointKey::new(method, path))
    }

    /// Entries with `confirmed = true`, in no particular order.
    pub fn confirmed_endpoints(&self) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.confirmed)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Every recorded entry, in no particular order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn get(&self, key: &EndpointKey) -> Option<LedgerEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark a key as about to be probed.
    ///
    /// Returns `false` if the key was already claimed, so at most one caller
    /// dispatches a given key.
    pub(crate) fn claim(&self, key: EndpointKey) -> bool {
        self.tested.insert(key)
    }

    /// Undo a claim for a key that was never dispatched.
    pub(crate) fn release(&self, key: &EndpointKey) {
        if !self.entries.contains_key(key) {
            self.tested.remove(key);
        }
    }
}

/// Why dispatching stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every candidate was attempted
    Exhausted,
    /// Max depth reached or no further ids discovered
    DepthLimit,
    RequestBudget,
    Deadline,
    Cancelled,
}

/// Process-scoped state for a single discovery run.
///
/// Created at run start and dropped (or turned into a report) at run end.
#[derive(Debug)]
pub struct DiscoveryState {
    ledger: DiscoveryLedger,
    depth: AtomicUsize,
    dispatched: AtomicUsize,
    max_requests: Option<usize>,
    started: Instant,
    deadline: Option<Instant>,
}

impl DiscoveryState {
    pub fn new(max_requests: Option<usize>, max_duration: Option<Duration>) -> Self {
        let started = Instant::now();
        Self {
            ledger: DiscoveryLedger::new(),
            depth: AtomicUsize::new(0),
            dispatched: AtomicUsize::new(0),
            max_requests,
            started,
            deadline: max_duration.map(|d| started + d),
        }
    }

    /// State with no request or time budget.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn ledger(&self) -> &DiscoveryLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> DiscoveryLedger {
        self.ledger
    }

    /// Current expansion depth.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub(crate) fn set_depth(&self, depth: usize) {
        self.depth.store(depth, Ordering::SeqCst);
    }

    /// Probes dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub(crate) fn add_dispatched(&self, n: usize) {
        self.dispatched.fetch_add(n, Ordering::SeqCst);
    }

    /// Probes still allowed by the request budget.
    pub fn remaining_requests(&self) -> Option<usize> {
        self.max_requests
            .map(|max| max.saturating_sub(self.dispatched()))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Budget check consulted before each batch.
    pub fn budget_exceeded(&self) -> Option<StopReason> {
        if self.remaining_requests() == Some(0) {
            return Some(StopReason::RequestBudget);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(StopReason::Deadline);
        }
        None
    }
}
