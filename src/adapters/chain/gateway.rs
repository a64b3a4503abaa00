//! EVM Gateway - alloy-backed Port Implementation
//!
//! Implements the `EvmGateway` port over the shared RPC provider:
//! single calls, Multicall3-aggregated reads, bounded log queries, and
//! broadcasts with receipt waits. Every remote call carries a timeout and
//! passes through a concurrency cap so a slow provider cannot pile up
//! unbounded in-flight requests.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::NodeConfig;
use crate::ports::gateway::{
    BroadcastOutcome, CallOutcome, EvmGateway, LogEntry, LogQuery, TxRequest,
};

use super::provider::RpcProvider;

sol! {
    /// One call inside an aggregate; failures are tolerated per call.
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    /// Per-call outcome of an aggregate.
    struct CallResult {
        bool success;
        bytes returnData;
    }

    /// Canonical aggregator for batched reads with per-call failure.
    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
    }
}

/// `EvmGateway` implementation over alloy-rs 0.9.
pub struct AlloyGateway {
    /// Shared RPC provider.
    provider: Arc<RpcProvider>,
    /// Aggregator contract for `multicall`.
    multicall3: Address,
    /// Concurrency limiter across all RPC calls.
    semaphore: Arc<Semaphore>,
    /// Per-read timeout.
    call_timeout: Duration,
    /// Receipt-wait timeout; inclusion is the long suspension point.
    confirm_timeout: Duration,
    /// Optional metrics sink.
    metrics: Option<Arc<MetricsRegistry>>,
}

impl AlloyGateway {
    /// Build a gateway from the shared provider and node config.
    pub fn new(provider: Arc<RpcProvider>, config: &NodeConfig) -> Result<Self> {
        let multicall3: Address = config
            .multicall3
            .parse()
            .context("Invalid multicall3 address")?;

        Ok(Self {
            provider,
            multicall3,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls)),
            call_timeout: Duration::from_secs(config.timeout_seconds),
            // Inclusion takes longer than a read; give it several blocks.
            confirm_timeout: Duration::from_secs(config.timeout_seconds * 10),
            metrics: None,
        })
    }

    /// Attach a metrics registry; per-method call counters.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn count_call(&self, method: &str) {
        if let Some(m) = &self.metrics {
            m.rpc_calls.with_label_values(&[method]).inc();
        }
    }

    /// Run a remote call under the semaphore with the read timeout.
    async fn bounded<T, Fut>(&self, method: &str, fut: Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .context("Gateway semaphore closed")?;
        self.count_call(method);

        tokio::time::timeout(self.call_timeout, fut)
            .await
            .with_context(|| format!("{method} timed out"))?
    }
}

#[async_trait]
impl EvmGateway for AlloyGateway {
    async fn chain_id(&self) -> Result<u64> {
        let inner = self.provider.inner();
        self.bounded("eth_chainId", async move {
            inner.get_chain_id().await.context("chain id query failed")
        })
        .await
    }

    async fn block_number(&self) -> Result<u64> {
        let inner = self.provider.inner();
        self.bounded("eth_blockNumber", async move {
            inner
                .get_block_number()
                .await
                .context("block number query failed")
        })
        .await
    }

    fn account(&self) -> Option<Address> {
        self.provider.account()
    }

    #[instrument(skip(self, data), fields(to = %to))]
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let inner = self.provider.inner();
        self.bounded("eth_call", async move {
            let tx = TransactionRequest::default().to(to).input(data.into());
            inner.call(&tx).await.context("eth_call failed")
        })
        .await
    }

    #[instrument(skip_all, fields(calls = calls.len()))]
    async fn multicall(&self, calls: &[(Address, Bytes)]) -> Result<Vec<CallOutcome>> {
        let aggregated = IMulticall3::aggregate3Call {
            calls: calls
                .iter()
                .map(|(target, data)| Call3 {
                    target: *target,
                    allowFailure: true,
                    callData: data.clone(),
                })
                .collect(),
        };

        let raw = self
            .call(self.multicall3, Bytes::from(aggregated.abi_encode()))
            .await?;

        let decoded = IMulticall3::aggregate3Call::abi_decode_returns(&raw, true)
            .context("aggregate3 return decode failed")?;

        Ok(decoded
            .returnData
            .into_iter()
            .map(|r| CallOutcome {
                success: r.success,
                data: r.returnData,
            })
            .collect())
    }

    #[instrument(skip(self), fields(address = %query.address, from = query.from_block, to = query.to_block))]
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let mut filter = Filter::new()
            .address(query.address)
            .from_block(query.from_block)
            .to_block(query.to_block);

        if let Some(Some(t0)) = query.topics.first() {
            filter = filter.event_signature(*t0);
        }
        if let Some(Some(t1)) = query.topics.get(1) {
            filter = filter.topic1(*t1);
        }
        if let Some(Some(t2)) = query.topics.get(2) {
            filter = filter.topic2(*t2);
        }
        if let Some(Some(t3)) = query.topics.get(3) {
            filter = filter.topic3(*t3);
        }

        let inner = self.provider.inner();
        let logs = self
            .bounded("eth_getLogs", async move {
                inner.get_logs(&filter).await.context("eth_getLogs failed")
            })
            .await?;

        Ok(logs
            .into_iter()
            .map(|log| LogEntry {
                address: log.address(),
                topics: log.topics().to_vec(),
                data: log.data().data.clone(),
                block_number: log.block_number.unwrap_or_default(),
                transaction_hash: log.transaction_hash.unwrap_or_default(),
                log_index: log.log_index.unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self, tx), fields(to = %tx.to))]
    async fn send_transaction(&self, tx: &TxRequest) -> Result<BroadcastOutcome> {
        anyhow::ensure!(
            self.provider.account().is_some(),
            "No signer configured — set KEEPER_PRIVATE_KEY to broadcast"
        );

        let request = TransactionRequest::default()
            .to(tx.to)
            .value(tx.value)
            .input(tx.data.clone().into());

        let inner = self.provider.inner();
        let _permit = self
            .semaphore
            .acquire()
            .await
            .context("Gateway semaphore closed")?;
        self.count_call("eth_sendTransaction");

        let pending = inner
            .send_transaction(request)
            .await
            .context("broadcast failed")?;
        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, "Broadcast sent, awaiting inclusion");

        let receipt = tokio::time::timeout(self.confirm_timeout, pending.get_receipt())
            .await
            .context("confirmation wait timed out")?
            .context("receipt fetch failed")?;

        let success = receipt.status();
        if !success {
            warn!(tx_hash = %tx_hash, "Transaction reverted on-chain");
        }

        Ok(BroadcastOutcome {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            success,
            revert_reason: (!success).then(|| "execution reverted".to_string()),
        })
    }

    async fn is_healthy(&self) -> bool {
        self.provider.is_healthy().await
    }
}
