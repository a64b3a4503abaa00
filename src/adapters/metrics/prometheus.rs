//! Prometheus Metrics Registry - Keeper Observability
//!
//! Registers and exposes Prometheus metrics for dashboards covering RPC
//! traffic, proposal lifecycle transitions, broadcast outcomes, and
//! execution progress.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the keeper.
///
/// All metrics follow the naming convention `govexec_*` and include
/// proposal labels for multi-proposal filtering.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// RPC calls by JSON-RPC method.
    pub rpc_calls: IntCounterVec,
    /// Proposals currently tracked.
    pub proposals_tracked: IntGauge,
    /// Lifecycle transitions observed, by proposal and new phase.
    pub phase_transitions: IntCounterVec,
    /// Broadcasts by kind (propose/answer/dispute/execute/approve) and outcome.
    pub broadcasts: IntCounterVec,
    /// Batches executed per proposal.
    pub batches_executed: IntCounterVec,
    /// Whether a proposal is currently executable (1 = ready).
    pub execution_ready: GaugeVec,
    /// Bond required for the next answer, in wei (lossy f64, display only).
    pub bond_required: GaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let rpc_calls = IntCounterVec::new(
            Opts::new("govexec_rpc_calls_total", "RPC calls by method"),
            &["method"],
        )?;

        let proposals_tracked = IntGauge::new(
            "govexec_proposals_tracked",
            "Number of proposals currently tracked",
        )?;

        let phase_transitions = IntCounterVec::new(
            Opts::new(
                "govexec_phase_transitions_total",
                "Proposal lifecycle transitions observed",
            ),
            &["proposal", "phase"],
        )?;

        let broadcasts = IntCounterVec::new(
            Opts::new("govexec_broadcasts_total", "Broadcasts by kind and outcome"),
            &["kind", "outcome"],
        )?;

        let batches_executed = IntCounterVec::new(
            Opts::new(
                "govexec_batches_executed_total",
                "Batches executed per proposal",
            ),
            &["proposal"],
        )?;

        let execution_ready = GaugeVec::new(
            Opts::new(
                "govexec_execution_ready",
                "Whether the proposal has an executable step (1 = ready)",
            ),
            &["proposal"],
        )?;

        let bond_required = GaugeVec::new(
            Opts::new(
                "govexec_bond_required_wei",
                "Bond required for the next answer (wei, lossy)",
            ),
            &["proposal"],
        )?;

        // Register all metrics
        registry.register(Box::new(rpc_calls.clone()))?;
        registry.register(Box::new(proposals_tracked.clone()))?;
        registry.register(Box::new(phase_transitions.clone()))?;
        registry.register(Box::new(broadcasts.clone()))?;
        registry.register(Box::new(batches_executed.clone()))?;
        registry.register(Box::new(execution_ready.clone()))?;
        registry.register(Box::new(bond_required.clone()))?;

        Ok(Self {
            registry,
            rpc_calls,
            proposals_tracked,
            phase_transitions,
            broadcasts,
            batches_executed,
            execution_ready,
            bond_required,
        })
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let registry = metrics_self.registry.clone();
                async move {
                    let encoder = TextEncoder::new();
                    let metric_families = registry.gather();
                    let mut buffer = Vec::new();
                    encoder.encode(&metric_families, &mut buffer).unwrap();
                    String::from_utf8(buffer).unwrap_or_default()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
