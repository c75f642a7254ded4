//! Run orchestration.
//!
//! A run is a sequence of waves. Wave 0 sweeps the generated candidates;
//! each later wave sweeps the children expanded from the previous wave's
//! confirmed collections, one depth deeper. The run ends when `max_depth`
//! is reached, a wave yields no new IDs, or the budget or cancellation
//! token stops a sweep.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::expander::RecursiveExpander;
use crate::generator::PatternGenerator;
use crate::ledger::{DiscoveryState, StopReason};
use crate::probe::ProbeExecutor;
use crate::report::DiscoveryReport;
use crate::scheduler::{BatchScheduler, SweepOutcome};
use crate::traits::transport::Transport;
use crate::transports::{HttpTransport, RateLimitedTransport};
use crate::types::candidate::Candidate;
use crate::types::config::DiscoveryConfig;

/// Wrap `transport` in request pacing when the config asks for it.
pub fn paced_transport<T>(transport: T, config: &DiscoveryConfig) -> Result<Arc<dyn Transport>>
where
    T: Transport + 'static,
{
    match config.requests_per_second {
        Some(rps) => Ok(Arc::new(RateLimitedTransport::new(transport, rps)?)),
        None => Ok(Arc::new(transport)),
    }
}

/// Endpoint discovery over a transport.
///
/// # Example
///
/// ```rust,ignore
/// use endpoint_discovery::{DiscoveryConfig, EndpointDiscovery};
///
/// let config = DiscoveryConfig::new("https://app.example.com")
///     .with_resource_stems(["project", "execution"])
///     .with_max_depth(1);
///
/// let report = EndpointDiscovery::http(config)?.run().await;
/// println!("{}", report);
/// ```
pub struct EndpointDiscovery<T: Transport> {
    config: DiscoveryConfig,
    generator: PatternGenerator,
    executor: ProbeExecutor<T>,
    scheduler: BatchScheduler,
    expander: RecursiveExpander,
}

impl EndpointDiscovery<Arc<dyn Transport>> {
    /// Discovery over `HttpTransport`, paced if `requests_per_second` is set.
    pub fn http(config: DiscoveryConfig) -> Result<Self> {
        let transport = paced_transport(HttpTransport::new()?, &config)?;
        Self::new(config, transport)
    }
}

impl<T: Transport> EndpointDiscovery<T> {
    /// Validate `config` and wire up the components.
    pub fn new(config: DiscoveryConfig, transport: T) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            generator: PatternGenerator::from_config(&config),
            executor: ProbeExecutor::from_config(transport, &config),
            scheduler: BatchScheduler::from_config(&config),
            expander: RecursiveExpander::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn generator(&self) -> &PatternGenerator {
        &self.generator
    }

    pub fn transport(&self) -> &T {
        self.executor.transport()
    }

    /// Run to completion (or until the budget is spent).
    pub async fn run(&self) -> DiscoveryReport {
        self.run_until(CancellationToken::new()).await
    }

    /// Run until done or until `cancel` fires. Partial results are reported.
    pub async fn run_until(&self, cancel: CancellationToken) -> DiscoveryReport {
        let started_at = Utc::now();
        let state = DiscoveryState::new(self.config.max_requests, self.config.max_duration());

        info!(
            base_url = %self.config.base_url,
            max_depth = self.config.max_depth,
            batch_size = self.scheduler.batch_size(),
            "Starting endpoint discovery"
        );

        let mut depth = 0;
        let mut sweep = self
            .scheduler
            .run(self.generator.candidates(), &self.executor, &state, &cancel)
            .await;
        self.log_wave(depth, &sweep);

        let stop_reason = loop {
            if sweep.stop_reason != StopReason::Exhausted {
                break sweep.stop_reason;
            }
            if depth >= self.expander.max_depth() {
                break StopReason::DepthLimit;
            }

            let next = self.next_wave(&sweep, &state);
            if next.is_empty() {
                break StopReason::Exhausted;
            }

            depth += 1;
            state.set_depth(depth);
            info!(depth = depth, candidates = next.len(), "Expanding into discovered resources");

            sweep = self.scheduler.run(next, &self.executor, &state, &cancel).await;
            self.log_wave(depth, &sweep);
        };

        let report = DiscoveryReport::from_state(&state, stop_reason, started_at);
        info!(
            tested = report.total_tested,
            confirmed = report.confirmed_count(),
            failed = report.failed_count(),
            deepest_depth = report.deepest_depth,
            stop_reason = ?report.stop_reason,
            elapsed = ?state.elapsed(),
            "Endpoint discovery complete"
        );
        report
    }

    /// Children of this wave's confirmed results that have not been probed.
    fn next_wave(&self, sweep: &SweepOutcome, state: &DiscoveryState) -> Vec<Candidate> {
        sweep
            .results
            .iter()
            .flat_map(|result| self.expander.expand(result, &self.generator))
            .filter(|child| !state.ledger().already_tested(child.method(), child.path()))
            .collect()
    }

    fn log_wave(&self, depth: usize, sweep: &SweepOutcome) {
        let confirmed = sweep.results.iter().filter(|r| r.is_confirmed()).count();
        info!(
            depth = depth,
            probed = sweep.dispatched(),
            batches = sweep.batches(),
            skipped = sweep.skipped,
            confirmed = confirmed,
            "Wave complete"
        );
    }
}
