//! govexec — Keeper Entry Point
//!
//! Initializes configuration, logging, the chain connection, and the
//! proposal keeper loop. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Connect the RPC provider (validates chain id; KEEPER_PRIVATE_KEY
//!    optional — read-only without it)
//! 4. Build the EVM gateway (multicall, timeouts, concurrency cap)
//! 5. Build the session cache bound to the posting account
//! 6. Build one oracle adapter per tracked proposal
//! 7. Spawn metrics + health servers
//! 8. Spawn the keeper sweep loop
//! 9. Wait for SIGINT → graceful shutdown (stop sweeps → flip readiness → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use govexec::adapters::chain::{AlloyGateway, RpcProvider};
use govexec::adapters::events::RangeFetcher;
use govexec::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use govexec::adapters::modules::{AssertionOracleAdapter, ExecutionModule, ReasonedOracleAdapter};
use govexec::config::{AppConfig, ModuleKind};
use govexec::ports::gateway::EvmGateway;
use govexec::usecases::keeper::{Keeper, TrackedProposal};
use govexec::usecases::session::SessionCache;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = govexec::config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.keeper.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.keeper.name,
        version = env!("CARGO_PKG_VERSION"),
        chain_id = config.node.chain_id,
        dry_run = config.keeper.dry_run,
        proposals = config.proposals.len(),
        "Starting govexec keeper"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health_state = Arc::new(HealthState::new());

    // ── 4. Connect provider + build gateway ─────────────────
    let provider = Arc::new(
        RpcProvider::connect(&config.node)
            .await
            .context("Failed to connect RPC provider")?,
    );

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to build metrics registry")?);
    let gateway: Arc<dyn EvmGateway> = Arc::new(
        AlloyGateway::new(Arc::clone(&provider), &config.node)
            .context("Failed to build gateway")?
            .with_metrics(Arc::clone(&metrics)),
    );

    // ── 5. Session cache bound to the posting account ───────
    let session = Arc::new(SessionCache::new());
    session.set_account(provider.account());
    if provider.account().is_none() && config.keeper.auto_execute {
        warn!("auto_execute enabled without a signer — broadcasts will fail");
    }

    // ── 6. Build one adapter per tracked proposal ───────────
    let tracked = build_proposals(&config, &gateway, &session)?;
    if tracked.is_empty() {
        warn!("No proposals configured — keeper will idle");
    }

    // ── 7. Spawn metrics + health servers ───────────────────
    let mut server_handles = Vec::new();
    if config.metrics.enabled {
        let metrics_handle = tokio::spawn(
            Arc::clone(&metrics).serve(config.metrics.bind_address.clone(), shutdown_tx.subscribe()),
        );
        let health_handle = tokio::spawn(
            HealthServer::new(Arc::clone(&health_state), config.metrics.health_port)
                .run(shutdown_tx.subscribe()),
        );
        server_handles.push(metrics_handle);
        server_handles.push(health_handle);
    }

    // ── 8. Spawn the keeper sweep loop ──────────────────────
    let keeper = Keeper::new(
        tracked,
        Duration::from_secs(config.keeper.poll_interval_seconds),
        config.keeper.auto_execute,
        config.keeper.dry_run,
    )
    .with_metrics(Arc::clone(&metrics));
    let keeper_handle = tokio::spawn(keeper.run(shutdown_tx.subscribe()));

    info!("All tasks spawned — keeper is running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // Graceful shutdown: stop sweeps, flip readiness, drain tasks.
    let _ = shutdown_tx.send(());
    health_state
        .keeper_running
        .store(false, std::sync::atomic::Ordering::Relaxed);

    if let Err(e) = tokio::time::timeout(Duration::from_secs(30), keeper_handle).await {
        error!(error = %e, "Keeper did not stop in time");
    }
    for handle in server_handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Instantiate the configured proposals against their modules.
fn build_proposals(
    config: &AppConfig,
    gateway: &Arc<dyn EvmGateway>,
    session: &Arc<SessionCache>,
) -> Result<Vec<TrackedProposal>> {
    let fetcher = RangeFetcher::new(
        config.scan.max_range,
        config.scan.multiplier,
        config.scan.width,
    );

    let mut tracked = Vec::with_capacity(config.proposals.len());
    for proposal in &config.proposals {
        let module = config
            .modules
            .iter()
            .find(|m| m.name == proposal.module)
            .context("validated config lost a module")?;
        let address: alloy::primitives::Address = module.address.parse()?;
        let batches = proposal.to_batches()?;
        let name = format!("{}/{}", module.name, proposal.proposal_id);

        let adapter = match module.kind {
            ModuleKind::Reality => ExecutionModule::Reasoned(ReasonedOracleAdapter::new(
                Arc::clone(gateway),
                Arc::clone(session),
                config.node.chain_id,
                address,
                module.safe_version,
                proposal.proposal_id.clone(),
                &batches,
                fetcher.clone(),
                config.scan.start_block,
            )?),
            ModuleKind::Optimistic => {
                // The assertion module executes the whole set atomically;
                // batch boundaries collapse into one ordered list.
                let transactions = batches
                    .into_iter()
                    .flat_map(|batch| batch.transactions)
                    .collect();
                ExecutionModule::Assertion(AssertionOracleAdapter::new(
                    Arc::clone(gateway),
                    Arc::clone(session),
                    address,
                    proposal.proposal_id.clone(),
                    transactions,
                    proposal.explanation.clone(),
                    fetcher.clone(),
                    config.scan.start_block,
                ))
            }
        };

        tracked.push(TrackedProposal::new(name, Box::new(adapter)));
    }

    Ok(tracked)
}
