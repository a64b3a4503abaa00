//! Keeper Loop - Proposal Shepherding
//!
//! Periodically refreshes every tracked proposal, logs lifecycle
//! transitions, and (when enabled) executes steps the oracle has made
//! executable. State is re-read after every confirmed write; a refresh
//! that raced a write never drives a decision.
//!
//! Sweep flow:
//! 1. Refresh each proposal's on-chain state
//! 2. Log and count phase transitions
//! 3. If auto-execute: run the next executable step, then re-refresh
//! 4. Repeat on the configured interval until shutdown

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::error::ExecError;
use crate::domain::proposal::ProposalPhase;
use crate::ports::module::ExecutionAdapter;

/// One proposal under the keeper's care.
pub struct TrackedProposal {
    /// Display name (module name + proposal id).
    pub name: String,
    /// The proposal's oracle adapter.
    pub adapter: Box<dyn ExecutionAdapter>,
    /// Last phase seen, for transition logging.
    last_phase: Option<ProposalPhase>,
}

impl TrackedProposal {
    pub fn new(name: String, adapter: Box<dyn ExecutionAdapter>) -> Self {
        Self {
            name,
            adapter,
            last_phase: None,
        }
    }
}

/// Periodic sweeper over all tracked proposals.
pub struct Keeper {
    proposals: Vec<TrackedProposal>,
    poll_interval: std::time::Duration,
    auto_execute: bool,
    dry_run: bool,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Keeper {
    pub fn new(
        proposals: Vec<TrackedProposal>,
        poll_interval: std::time::Duration,
        auto_execute: bool,
        dry_run: bool,
    ) -> Self {
        Self {
            proposals,
            poll_interval,
            auto_execute,
            dry_run,
            metrics: None,
        }
    }

    /// Attach a metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        metrics.proposals_tracked.set(self.proposals.len() as i64);
        self.metrics = Some(metrics);
        self
    }

    /// Run sweeps until the shutdown signal fires.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            proposals = self.proposals.len(),
            auto_execute = self.auto_execute,
            dry_run = self.dry_run,
            "Keeper started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Keeper received shutdown signal");
                    break;
                }
                () = tokio::time::sleep(self.poll_interval) => {
                    self.sweep().await;
                }
            }
        }

        info!("Keeper stopped cleanly");
    }

    /// One pass over every tracked proposal.
    pub async fn sweep(&mut self) {
        for tracked in &mut self.proposals {
            if let Err(e) = Self::tend(
                tracked,
                self.auto_execute,
                self.dry_run,
                self.metrics.as_deref(),
            )
            .await
            {
                error!(proposal = %tracked.name, error = %e, "Sweep failed");
            }
        }
    }

    /// Refresh one proposal and execute what has become executable.
    async fn tend(
        tracked: &mut TrackedProposal,
        auto_execute: bool,
        dry_run: bool,
        metrics: Option<&MetricsRegistry>,
    ) -> Result<(), ExecError> {
        let proposal = tracked.adapter.refresh().await?;

        if tracked.last_phase != Some(proposal.phase) {
            info!(
                proposal = %tracked.name,
                phase = %proposal.phase,
                previous = ?tracked.last_phase.map(|p| p.to_string()),
                "Phase transition"
            );
            if let Some(m) = metrics {
                let phase_label = proposal.phase.to_string();
                m.phase_transitions
                    .with_label_values(&[tracked.name.as_str(), phase_label.as_str()])
                    .inc();
            }
            tracked.last_phase = Some(proposal.phase);
        }

        let next = tracked.adapter.next_step().await?;
        if let Some(m) = metrics {
            m.execution_ready
                .with_label_values(&[tracked.name.as_str()])
                .set(f64::from(u8::from(next.is_some())));
        }

        let Some(step) = next else {
            return Ok(());
        };

        if !auto_execute {
            info!(proposal = %tracked.name, step, "Step executable (auto-execute off)");
            return Ok(());
        }
        if dry_run {
            info!(proposal = %tracked.name, step, "Dry-run: would execute step");
            return Ok(());
        }

        match tracked.adapter.execute(step).await {
            Ok(outcome) => {
                info!(
                    proposal = %tracked.name,
                    step,
                    tx = %outcome.tx_hash,
                    "Step executed"
                );
                if let Some(m) = metrics {
                    m.batches_executed
                        .with_label_values(&[tracked.name.as_str()])
                        .inc();
                    m.broadcasts.with_label_values(&["execute", "ok"]).inc();
                }
                // The write moved the state; decisions need a fresh read.
                let refreshed = tracked.adapter.refresh().await?;
                tracked.last_phase = Some(refreshed.phase);
            }
            Err(ExecError::PreconditionNotMet(reason)) => {
                // A time gate (cooldown) can still hold after next_step.
                debug!(proposal = %tracked.name, step, reason, "Execution deferred");
            }
            Err(e) => {
                if let Some(m) = metrics {
                    m.broadcasts
                        .with_label_values(&["execute", "error"])
                        .inc();
                }
                warn!(proposal = %tracked.name, step, error = %e, "Execution failed");
            }
        }

        Ok(())
    }
}
