//! EVM Gateway Port - Ledger Interaction Interface
//!
//! Defines the trait for everything the oracle adapters need from the
//! chain: reads, aggregated reads, log queries, and broadcasts. The ledger
//! is the single source of truth; this boundary never caches.

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;

/// A bounded log query against one contract.
#[derive(Debug, Clone)]
pub struct LogQuery {
    /// Emitting contract.
    pub address: Address,
    /// Topic filters; position 0 is the event signature. `None` matches any.
    pub topics: Vec<Option<B256>>,
    /// First block, inclusive.
    pub from_block: u64,
    /// Last block, inclusive.
    pub to_block: u64,
}

/// One log returned by a query.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics, signature first.
    pub topics: Vec<B256>,
    /// Unindexed payload.
    pub data: Bytes,
    /// Block the log landed in.
    pub block_number: u64,
    /// Transaction that emitted it.
    pub transaction_hash: B256,
    /// Position within the block.
    pub log_index: u64,
}

/// Result of one call inside an aggregated read.
///
/// A failed call is data here, not an error — the capability probe relies
/// on observing failure without aborting the whole aggregate.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    /// Whether the call succeeded.
    pub success: bool,
    /// Return data (revert data when `success` is false).
    pub data: Bytes,
}

/// A transaction to broadcast from the posting account.
#[derive(Debug, Clone)]
pub struct TxRequest {
    /// Target contract.
    pub to: Address,
    /// Native value to attach.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
}

impl TxRequest {
    /// A zero-value contract call.
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data,
        }
    }
}

/// Outcome of a broadcast after inclusion.
#[derive(Debug, Clone)]
pub struct BroadcastOutcome {
    /// Hash of the included transaction.
    pub tx_hash: B256,
    /// Block it was included in.
    pub block_number: u64,
    /// Whether execution succeeded.
    pub success: bool,
    /// Revert reason when available and `success` is false.
    pub revert_reason: Option<String>,
}

/// Trait for chain interactions via alloy-rs.
///
/// All methods are point-in-time reads or broadcasts; waiting for a
/// broadcast's inclusion is the only long-lived suspension point and the
/// caller may abandon the await (the transaction itself is not revocable
/// once sent).
#[async_trait]
pub trait EvmGateway: Send + Sync + 'static {
    /// Chain id of the connected network.
    async fn chain_id(&self) -> anyhow::Result<u64>;

    /// Latest block number.
    async fn block_number(&self) -> anyhow::Result<u64>;

    /// The posting account, if a signer is configured.
    fn account(&self) -> Option<Address>;

    /// Single eth_call; reverts surface as errors.
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes>;

    /// Aggregated read; per-call failures are reported, not raised.
    async fn multicall(&self, calls: &[(Address, Bytes)]) -> anyhow::Result<Vec<CallOutcome>>;

    /// Fetch logs for one bounded window. Providers may reject windows
    /// that are too large; callers page through `adapters::events`.
    async fn get_logs(&self, query: &LogQuery) -> anyhow::Result<Vec<LogEntry>>;

    /// Broadcast from the posting account and wait for inclusion.
    async fn send_transaction(&self, tx: &TxRequest) -> anyhow::Result<BroadcastOutcome>;

    /// Check if the connection is healthy via a lightweight call.
    async fn is_healthy(&self) -> bool;
}
