//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that content addressing, batching, and bond
//! escalation maintain their invariants across random inputs.

use proptest::prelude::*;

use alloy::primitives::{Address, Bytes, U256};

use govexec::domain::batch::{SafeVersion, decode_batch, encode_batch, pack_multisend, unpack_multisend};
use govexec::domain::bond::required_bond;
use govexec::domain::hashing::{proposal_hash, transaction_hash};
use govexec::domain::transaction::{ExecutionBatch, ModuleTransaction, Operation};

fn arb_transaction() -> impl Strategy<Value = ModuleTransaction> {
    (
        any::<[u8; 20]>(),
        any::<u64>(),
        proptest::collection::vec(any::<u8>(), 0..64),
        any::<bool>(),
    )
        .prop_map(|(to, value, data, delegate)| ModuleTransaction {
            to: Address::from(to),
            value: U256::from(value),
            data: Bytes::from(data),
            operation: if delegate {
                Operation::DelegateCall
            } else {
                Operation::Call
            },
        })
}

// ── Content Addressing Properties ───────────────────────────

proptest! {
    /// The typed hash is a pure function: identical inputs, identical hash.
    #[test]
    fn transaction_hash_deterministic(
        tx in arb_transaction(),
        chain_id in 1u64..100_000,
        nonce in 0u64..1_000,
    ) {
        let module = Address::repeat_byte(0x5a);
        prop_assert_eq!(
            transaction_hash(chain_id, module, &tx, nonce),
            transaction_hash(chain_id, module, &tx, nonce),
        );
    }

    /// Domain binding: a different chain or module changes the hash.
    #[test]
    fn transaction_hash_binds_domain(
        tx in arb_transaction(),
        chain_a in 1u64..1_000,
        chain_delta in 1u64..1_000,
    ) {
        let module = Address::repeat_byte(0x5a);
        prop_assert_ne!(
            transaction_hash(chain_a, module, &tx, 0),
            transaction_hash(chain_a + chain_delta, module, &tx, 0),
        );
    }

    /// Permuting two distinct transactions changes the proposal hash.
    #[test]
    fn proposal_hash_order_sensitive(
        a in arb_transaction(),
        b in arb_transaction(),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(
            proposal_hash(&[a.clone(), b.clone()]),
            proposal_hash(&[b, a]),
        );
    }
}

// ── Batching Properties ─────────────────────────────────────

proptest! {
    /// Packing then unpacking reproduces the member list exactly.
    #[test]
    fn multisend_round_trip(
        txs in proptest::collection::vec(arb_transaction(), 1..8),
    ) {
        let packed = pack_multisend(&txs);
        let unpacked = unpack_multisend(&packed).unwrap();
        prop_assert_eq!(unpacked, txs);
    }

    /// Encoding a batch and decoding it recovers the members in order,
    /// for single and multi-transaction batches alike.
    #[test]
    fn encode_decode_batch_round_trip(
        txs in proptest::collection::vec(arb_transaction(), 1..6),
    ) {
        let batch = ExecutionBatch::new(0, txs.clone());
        let encoded = encode_batch(1, SafeVersion::V1_3_0, &batch).unwrap();
        let decoded = decode_batch(&encoded).unwrap();
        prop_assert_eq!(decoded, txs);
    }
}

// ── Bond Escalation Properties ──────────────────────────────

proptest! {
    /// Escalation is monotonically non-decreasing across rounds.
    #[test]
    fn bond_escalation_monotone(
        minimum in 0u64..1_000_000,
        rounds in 1usize..20,
    ) {
        let minimum = U256::from(minimum);
        let mut current = U256::ZERO;
        let mut previous_required = U256::ZERO;
        for _ in 0..rounds {
            let required = required_bond(current, minimum, 18);
            prop_assert!(required >= previous_required);
            prop_assert!(required > U256::ZERO);
            previous_required = required;
            current = required;
        }
    }

    /// A standing bond always doubles, whatever the minimum says.
    #[test]
    fn standing_bond_doubles(
        current in 1u64..u64::MAX / 2,
        minimum in 0u64..1_000_000,
    ) {
        let current = U256::from(current);
        prop_assert_eq!(
            required_bond(current, U256::from(minimum), 6),
            current * U256::from(2u64),
        );
    }
}
