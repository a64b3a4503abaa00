//! RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Manages the connection to the target EVM chain via alloy-rs. Validates
//! RPC connectivity and chain id at startup and exposes a shared provider
//! instance for all on-chain operations.
//!
//! In alloy 0.9, `ProviderBuilder::new().on_http()` returns a complex
//! filler type. We store it as a type-erased `dyn Provider` to keep
//! the API clean across the adapter layer.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Http, reqwest::Client};
use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::config::NodeConfig;

/// Shared RPC provider backed by alloy-rs 0.9.
///
/// All chain adapters share a single provider instance to avoid
/// redundant connections and enable connection pooling. A signer is
/// attached only when `KEEPER_PRIVATE_KEY` is set; without one the
/// gateway is read-only and every broadcast fails fast.
pub struct RpcProvider {
    /// The alloy HTTP provider (type-erased).
    provider: Arc<dyn Provider<Http<Client>> + Send + Sync>,
    /// Posting account, when a signer is configured.
    account: Option<Address>,
    /// RPC endpoint URL (for diagnostics, never logged with secrets).
    #[allow(dead_code)]
    rpc_url: String,
}

impl RpcProvider {
    /// Connect to the RPC endpoint and validate the chain id.
    ///
    /// The URL and expected chain id come from `config.toml` (never
    /// hardcoded). The private key, if any, comes from the
    /// `KEEPER_PRIVATE_KEY` env var — keys never live in config files.
    #[instrument(skip_all)]
    pub async fn connect(config: &NodeConfig) -> Result<Self> {
        let rpc_url = config.rpc_url.clone();
        let url = rpc_url.parse().context("Invalid RPC URL")?;

        let signer: Option<PrivateKeySigner> = match std::env::var("KEEPER_PRIVATE_KEY") {
            Ok(raw) => Some(raw.parse().context("Invalid KEEPER_PRIVATE_KEY")?),
            Err(_) => None,
        };
        let account = signer.as_ref().map(PrivateKeySigner::address);

        // alloy 0.9: on_http() is synchronous, returns impl Provider.
        // Wrap in Arc<dyn Provider> for type erasure either way.
        let provider: Arc<dyn Provider<Http<Client>> + Send + Sync> = match signer {
            Some(signer) => Arc::new(
                ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .on_http(url),
            ),
            None => {
                warn!("KEEPER_PRIVATE_KEY not set — running read-only");
                Arc::new(ProviderBuilder::new().on_http(url))
            }
        };

        // Validate chain id at startup
        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        anyhow::ensure!(
            chain_id == config.chain_id,
            "Expected chain_id={}, RPC endpoint reports {chain_id}",
            config.chain_id
        );

        info!(chain_id, account = ?account, "Connected to RPC");

        Ok(Self {
            provider,
            account,
            rpc_url,
        })
    }

    /// Get a shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> Arc<dyn Provider<Http<Client>> + Send + Sync> {
        Arc::clone(&self.provider)
    }

    /// Posting account, when a signer is configured.
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    /// Check if the RPC connection is healthy via a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}
