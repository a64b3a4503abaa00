//! Content-addressed proposal identifiers.
//!
//! Two distinct hashes anchor a proposal on-chain:
//!
//! - the per-transaction EIP-712 typed hash, domain-bound to
//!   `{chainId, verifyingContract}` so a batch cannot be replayed on a
//!   different chain or module — the question anchor for the market-oracle
//!   module;
//! - the proposal hash, a bare keccak256 over the ABI-encoded
//!   `(to, operation, value, data)[]` tuple array — the claim anchor for
//!   the assertion module.
//!
//! Both are pure functions of content plus domain. Any client must be able
//! to predict them before submission; the struct field order below is part
//! of the wire contract and must not change.

use alloy::primitives::{Address, B256, U256, keccak256};
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct, SolValue};

use super::transaction::ModuleTransaction;

sol! {
    /// EIP-712 struct hashed per transaction by the market-oracle module.
    /// Field order is fixed; changing it diverges from the on-chain
    /// typehash.
    struct Transaction {
        address to;
        uint256 value;
        bytes data;
        uint8 operation;
        uint256 nonce;
    }

    /// Tuple layout hashed by the assertion module for the whole batch.
    struct AssertedTransaction {
        address to;
        uint8 operation;
        uint256 value;
        bytes data;
    }
}

/// EIP-712 domain binding hashes to one module on one chain.
fn module_domain(chain_id: u64, module: Address) -> Eip712Domain {
    Eip712Domain {
        name: None,
        version: None,
        chain_id: Some(U256::from(chain_id)),
        verifying_contract: Some(module),
        salt: None,
    }
}

/// Typed hash of a single transaction at a given nonce.
///
/// `keccak256(0x1901 ‖ domainSeparator ‖ structHash)` with the domain
/// `{chainId, verifyingContract: module}`.
pub fn transaction_hash(
    chain_id: u64,
    module: Address,
    tx: &ModuleTransaction,
    nonce: u64,
) -> B256 {
    let typed = Transaction {
        to: tx.to,
        value: tx.value,
        data: tx.data.clone(),
        operation: tx.operation.as_u8(),
        nonce: U256::from(nonce),
    };
    typed.eip712_signing_hash(&module_domain(chain_id, module))
}

/// Typed hashes for an ordered list of batch transactions, nonce = index.
pub fn transaction_hashes(
    chain_id: u64,
    module: Address,
    transactions: &[ModuleTransaction],
) -> Vec<B256> {
    transactions
        .iter()
        .enumerate()
        .map(|(nonce, tx)| transaction_hash(chain_id, module, tx, nonce as u64))
        .collect()
}

/// Canonical batch identifier for the assertion module.
///
/// `keccak256(abi.encode(transactions))` over the
/// `(to, operation, value, data)[]` tuple array. Identical transactions in
/// identical order always produce the same hash, independent of submitter
/// or time.
pub fn proposal_hash(transactions: &[ModuleTransaction]) -> B256 {
    let tuples: Vec<AssertedTransaction> = transactions
        .iter()
        .map(|tx| AssertedTransaction {
            to: tx.to,
            operation: tx.operation.as_u8(),
            value: tx.value,
            data: tx.data.clone(),
        })
        .collect();

    keccak256(tuples.abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::Operation;
    use alloy::primitives::{Bytes, address};

    const MODULE: Address = address!("00000000000000000000000000000000000000de");

    fn sample_tx(seed: u8) -> ModuleTransaction {
        ModuleTransaction {
            to: Address::repeat_byte(seed),
            value: U256::from(seed as u64),
            data: Bytes::from(vec![seed, seed]),
            operation: Operation::Call,
        }
    }

    #[test]
    fn test_transaction_hash_is_deterministic() {
        let tx = sample_tx(7);
        assert_eq!(
            transaction_hash(1, MODULE, &tx, 0),
            transaction_hash(1, MODULE, &tx, 0)
        );
    }

    #[test]
    fn test_transaction_hash_binds_chain_and_module() {
        let tx = sample_tx(7);
        let base = transaction_hash(1, MODULE, &tx, 0);
        assert_ne!(base, transaction_hash(100, MODULE, &tx, 0));
        assert_ne!(
            base,
            transaction_hash(1, Address::repeat_byte(0x11), &tx, 0)
        );
    }

    #[test]
    fn test_transaction_hash_binds_nonce() {
        let tx = sample_tx(7);
        assert_ne!(
            transaction_hash(1, MODULE, &tx, 0),
            transaction_hash(1, MODULE, &tx, 1)
        );
    }

    #[test]
    fn test_proposal_hash_is_order_sensitive() {
        let a = sample_tx(1);
        let b = sample_tx(2);
        assert_ne!(
            proposal_hash(&[a.clone(), b.clone()]),
            proposal_hash(&[b, a])
        );
    }

    #[test]
    fn test_proposal_hash_differs_from_typed_hash() {
        let tx = sample_tx(9);
        assert_ne!(
            proposal_hash(std::slice::from_ref(&tx)),
            transaction_hash(1, MODULE, &tx, 0)
        );
    }

    #[test]
    fn test_batch_hashes_use_positional_nonces() {
        let txs = vec![sample_tx(1), sample_tx(1)];
        let hashes = transaction_hashes(1, MODULE, &txs);
        // Same content, different nonce slot — hashes must differ.
        assert_ne!(hashes[0], hashes[1]);
    }
}
