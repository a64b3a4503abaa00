//! Failure taxonomy for the execution-authorization protocol.
//!
//! Every failure a caller can act on gets its own variant. Remote-call
//! plumbing errors pass through as `Gateway`; on-chain reverts are carried
//! verbatim in `BroadcastReverted` and never retried here.

use alloy::primitives::U256;
use thiserror::Error;

/// Errors surfaced by the batching, bonding, and oracle-adapter layers.
#[derive(Debug, Error)]
pub enum ExecError {
    /// No contract address registered for this chain / version pair.
    #[error("unsupported network: no {artifact} registered for chain {chain_id} ({detail})")]
    UnsupportedNetwork {
        chain_id: u64,
        artifact: &'static str,
        detail: String,
    },

    /// A client-side precondition failed; nothing was broadcast.
    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// The posting account's token balance cannot cover the required bond.
    #[error("insufficient bond: required {required}, balance {balance}")]
    InsufficientBond { required: U256, balance: U256 },

    /// The posting account's ERC-20 allowance cannot cover the required bond.
    #[error("insufficient allowance: required {required}, approved {allowance}")]
    InsufficientAllowance { required: U256, allowance: U256 },

    /// The log paginator shrank a query window to zero blocks and gave up.
    #[error("log range scan exhausted between blocks {start} and {end}")]
    RangeExhausted { start: u64, end: u64 },

    /// A contract returned data that does not match the expected ABI shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// A broadcast transaction was included and reverted.
    #[error("broadcast reverted: {0}")]
    BroadcastReverted(String),

    /// Transport / provider failure from the EVM gateway.
    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}

impl ExecError {
    /// Shorthand for a decode failure with context about which call
    /// produced the unexpected shape.
    pub fn decode(call: &str, why: impl std::fmt::Display) -> Self {
        Self::Decode(format!("{call}: {why}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_amounts() {
        let err = ExecError::InsufficientAllowance {
            required: U256::from(100u64),
            allowance: U256::from(7u64),
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("7"));
    }

    #[test]
    fn test_gateway_from_anyhow() {
        let inner = anyhow::anyhow!("connection refused");
        let err: ExecError = inner.into();
        assert!(matches!(err, ExecError::Gateway(_)));
    }
}
