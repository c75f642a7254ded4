//! Batch scheduler: bounded-concurrency sweep over a candidate sequence.
//!
//! Candidates are drained into fixed-size batches. Probes within a batch
//! run concurrently; batch N+1 starts only after every probe in batch N has
//! settled and the inter-batch delay has elapsed. The run budget and the
//! cancellation token are consulted before each batch. Whatever was
//! collected before a stop is returned.

use futures::future::join_all;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ledger::{DiscoveryState, StopReason};
use crate::probe::ProbeExecutor;
use crate::traits::transport::Transport;
use crate::types::candidate::Candidate;
use crate::types::config::DiscoveryConfig;
use crate::types::probe::ProbeResult;

/// Results of one sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Every probe result, batch by batch
    pub results: Vec<ProbeResult>,

    /// Size of each dispatched batch, in dispatch order
    pub batch_sizes: Vec<usize>,

    /// Candidates skipped because their key was already tested
    pub skipped: usize,

    pub stop_reason: StopReason,
}

impl SweepOutcome {
    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }

    pub fn dispatched(&self) -> usize {
        self.results.len()
    }
}

#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size: usize,
    request_delay: Duration,
}

impl BatchScheduler {
    /// A `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize, request_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            request_delay,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.batch_size, config.request_delay())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Probe every candidate not yet tested in `state`, batch by batch.
    pub async fn run<T, I>(
        &self,
        candidates: I,
        executor: &ProbeExecutor<T>,
        state: &DiscoveryState,
        cancel: &CancellationToken,
    ) -> SweepOutcome
    where
        T: Transport,
        I: IntoIterator<Item = Candidate>,
    {
        let mut candidates = candidates.into_iter();
        let mut results = Vec::new();
        let mut batch_sizes: Vec<usize> = Vec::new();
        let mut skipped = 0;

        let stop_reason = loop {
            if let Some(reason) = stop_requested(state, cancel) {
                break reason;
            }

            let limit = state
                .remaining_requests()
                .map_or(self.batch_size, |remaining| remaining.min(self.batch_size));

            let mut batch = Vec::with_capacity(limit);
            while batch.len() < limit {
                let Some(candidate) = candidates.next() else {
                    break;
                };
                if state.ledger().claim(candidate.key()) {
                    batch.push(candidate);
                } else {
                    skipped += 1;
                }
            }

            if batch.is_empty() {
                break StopReason::Exhausted;
            }

            if !batch_sizes.is_empty() && !self.request_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.request_delay) => {}
                }
            }

            if let Some(reason) = stop_requested(state, cancel) {
                for candidate in &batch {
                    state.ledger().release(&candidate.key());
                }
                break reason;
            }

            let batch_number = batch_sizes.len() + 1;
            let size = batch.len();
            state.add_dispatched(size);
            debug!(batch = batch_number, size = size, depth = state.depth(), "Dispatching batch");

            let ledger = state.ledger();
            let probes = batch.into_iter().map(|candidate| async move {
                let result = executor.probe(candidate).await;
                ledger.record(result.clone());
                result
            });
            let batch_results = join_all(probes).await;

            let confirmed = batch_results.iter().filter(|r| r.is_confirmed()).count();
            info!(
                batch = batch_number,
                size = size,
                confirmed = confirmed,
                total_dispatched = state.dispatched(),
                "Batch complete"
            );

            results.extend(batch_results);
            batch_sizes.push(size);
        };

        match stop_reason {
            StopReason::Exhausted => {}
            reason => warn!(reason = ?reason, batches = batch_sizes.len(), "Sweep stopped early"),
        }

        SweepOutcome {
            results,
            batch_sizes,
            skipped,
            stop_reason,
        }
    }
}

fn stop_requested(state: &DiscoveryState, cancel: &CancellationToken) -> Option<StopReason> {
    if cancel.is_cancelled() {
        return Some(StopReason::Cancelled);
    }
    state.budget_exceeded()
}
