//! Configuration Module - TOML-based Keeper Configuration
//!
//! Loads and validates configuration from `config.toml` with env var
//! overrides for secrets. All contract addresses, chain parameters, and
//! tracked proposals are externalized here - nothing is hardcoded in the
//! domain layer.

pub mod loader;

use alloy::primitives::{Address, Bytes, U256};
use serde::Deserialize;

use crate::domain::batch::SafeVersion;
use crate::domain::transaction::{ExecutionBatch, ModuleTransaction, Operation};

/// Top-level keeper configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the keeper begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Keeper identity and behavior.
    pub keeper: KeeperConfig,
    /// RPC endpoint and chain parameters.
    pub node: NodeConfig,
    /// Log-scan pagination parameters.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Execution module definitions.
    pub modules: Vec<ModuleConfig>,
    /// Proposals this keeper shepherds.
    #[serde(default)]
    pub proposals: Vec<ProposalConfig>,
    /// Metrics and monitoring.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Keeper identity and behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KeeperConfig {
    /// Human-readable keeper name.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Compute readiness but never broadcast.
    #[serde(default)]
    pub dry_run: bool,
    /// Execute ready batches without operator action.
    #[serde(default)]
    pub auto_execute: bool,
    /// Seconds between state refresh sweeps.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Expected chain id; startup fails on mismatch.
    pub chain_id: u64,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Maximum concurrent RPC calls.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_calls: usize,
    /// Aggregator contract for batched reads.
    #[serde(default = "default_multicall3")]
    pub multicall3: String,
}

/// Log-scan pagination configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Block the module was deployed at; scans never look earlier.
    #[serde(default)]
    pub start_block: u64,
    /// Largest window attempted, in blocks.
    #[serde(default = "default_max_range")]
    pub max_range: u64,
    /// Grow/shrink factor between window attempts.
    #[serde(default = "default_multiplier")]
    pub multiplier: u64,
    /// Concurrent windows in flight.
    #[serde(default = "default_scan_width")]
    pub width: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            max_range: default_max_range(),
            multiplier: default_multiplier(),
            width: default_scan_width(),
        }
    }
}

/// Which oracle back-end a module speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Binary-question market oracle.
    Reality,
    /// Optimistic assertion oracle.
    Optimistic,
}

/// One execution module deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Name proposals reference this module by.
    pub name: String,
    /// Oracle back-end kind.
    pub kind: ModuleKind,
    /// Module contract address.
    pub address: String,
    /// Safe version of the avatar, for multisend resolution.
    #[serde(default = "default_safe_version")]
    pub safe_version: SafeVersion,
}

/// A tracked proposal: the vote id plus its transaction batches.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalConfig {
    /// Name of the module this proposal executes through.
    pub module: String,
    /// Off-chain vote id.
    pub proposal_id: String,
    /// Human-readable justification (assertion module only).
    #[serde(default)]
    pub explanation: String,
    /// Nonce-ordered batches.
    pub batches: Vec<BatchConfig>,
}

/// One batch of transactions within a proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Member transactions, executed atomically.
    pub transactions: Vec<TransactionConfig>,
}

/// One transaction inside a batch.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionConfig {
    /// Target address (0x-hex).
    pub to: String,
    /// Native value in wei (decimal string).
    #[serde(default)]
    pub value: Option<String>,
    /// Calldata (0x-hex).
    #[serde(default)]
    pub data: Option<String>,
    /// "call" (default) or "delegatecall".
    #[serde(default)]
    pub operation: Option<String>,
}

impl TransactionConfig {
    /// Parse into the domain representation.
    pub fn to_domain(&self) -> anyhow::Result<ModuleTransaction> {
        let to: Address = self
            .to
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid address {}: {e}", self.to))?;

        let value = match self.value.as_deref() {
            None | Some("") => U256::ZERO,
            Some(raw) => U256::from_str_radix(raw.trim_start_matches("0x"), if raw.starts_with("0x") { 16 } else { 10 })
                .map_err(|e| anyhow::anyhow!("invalid value {raw}: {e}"))?,
        };

        let data = match self.data.as_deref() {
            None | Some("") | Some("0x") => Bytes::new(),
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid calldata {raw}: {e}"))?,
        };

        let operation = match self.operation.as_deref() {
            None | Some("call") => Operation::Call,
            Some("delegatecall") => Operation::DelegateCall,
            Some(other) => anyhow::bail!("invalid operation {other}"),
        };

        Ok(ModuleTransaction {
            to,
            value,
            data,
            operation,
        })
    }
}

impl ProposalConfig {
    /// Parse all batches into domain batches, nonce = position.
    pub fn to_batches(&self) -> anyhow::Result<Vec<ExecutionBatch>> {
        self.batches
            .iter()
            .enumerate()
            .map(|(nonce, batch)| {
                let transactions = batch
                    .transactions
                    .iter()
                    .map(TransactionConfig::to_domain)
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(ExecutionBatch::new(nonce as u64, transactions))
            })
            .collect()
    }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Metrics server bind address.
    #[serde(default = "default_metrics_addr")]
    pub bind_address: String,
    /// Health check endpoint port.
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_metrics_addr(),
            health_port: default_health_port(),
        }
    }
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    10
}

fn default_multicall3() -> String {
    // Canonical Multicall3, same address on every supported chain.
    "0xcA11bde05977b3631167028862bE2a173976CA11".to_string()
}

fn default_max_range() -> u64 {
    crate::adapters::events::range::DEFAULT_MAX_RANGE
}

fn default_multiplier() -> u64 {
    crate::adapters::events::range::DEFAULT_MULTIPLIER
}

fn default_scan_width() -> usize {
    crate::adapters::events::range::DEFAULT_WIDTH
}

fn default_safe_version() -> SafeVersion {
    SafeVersion::V1_3_0
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
    8080
}
