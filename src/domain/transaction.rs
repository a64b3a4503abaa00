//! Core transaction domain types.
//!
//! A `ModuleTransaction` is one call the avatar (the multisig-owned account)
//! will perform if the oracle approves the proposal. Transactions are
//! immutable once batched: every identifier downstream (typed hashes,
//! proposal hashes, question strings) is a pure function of their content.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Lightweight proposal identifier used at the ports boundary.
///
/// This is the off-chain vote id (an IPFS hash or similar opaque string);
/// the protocol never interprets it beyond hashing.
pub type ProposalId = String;

/// How the avatar performs a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Regular CALL.
    Call,
    /// DELEGATECALL — used only for multisend-wrapped batches.
    DelegateCall,
}

impl Operation {
    /// Wire encoding used by both the multisend packing and the typed hash.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Call => 0,
            Self::DelegateCall => 1,
        }
    }

    /// Parse the wire encoding back into an operation.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Call),
            1 => Some(Self::DelegateCall),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::DelegateCall => write!(f, "delegatecall"),
        }
    }
}

/// A single transaction the avatar will execute on approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleTransaction {
    /// Target contract or recipient.
    pub to: Address,
    /// Native value forwarded with the call.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
    /// Call vs delegatecall.
    pub operation: Operation,
}

impl ModuleTransaction {
    /// A plain CALL with no value, the common case for contract interactions.
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data,
            operation: Operation::Call,
        }
    }
}

/// A nonce-ordered group of transactions executed as one unit.
///
/// The nonce is the batch's position within the overall proposal. A batch
/// of length one executes directly; longer batches are flattened into a
/// single delegatecall to a multisend contract before hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionBatch {
    /// Position of this batch within the proposal.
    pub nonce: u64,
    /// Ordered member transactions.
    pub transactions: Vec<ModuleTransaction>,
}

impl ExecutionBatch {
    /// Create a batch. Empty batches are rejected at config validation,
    /// not here.
    pub fn new(nonce: u64, transactions: Vec<ModuleTransaction>) -> Self {
        Self {
            nonce,
            transactions,
        }
    }

    /// Number of member transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the batch has no member transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_operation_round_trip() {
        assert_eq!(Operation::from_u8(Operation::Call.as_u8()), Some(Operation::Call));
        assert_eq!(
            Operation::from_u8(Operation::DelegateCall.as_u8()),
            Some(Operation::DelegateCall)
        );
        assert_eq!(Operation::from_u8(2), None);
    }

    #[test]
    fn test_call_constructor_defaults() {
        let tx = ModuleTransaction::call(
            address!("00000000000000000000000000000000000000aa"),
            Bytes::from(vec![0x01, 0x02]),
        );
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.operation, Operation::Call);
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(format!("{}", Operation::Call), "call");
        assert_eq!(format!("{}", Operation::DelegateCall), "delegatecall");
    }
}
