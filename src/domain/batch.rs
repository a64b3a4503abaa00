//! Transaction batching and multisend packing.
//!
//! A batch of one transaction executes directly. Longer batches are packed
//! into the multisend wire format — `(operation, to, value, dataLength,
//! data)` tuples tightly concatenated — and wrapped as a single
//! delegatecall to the network's multisend contract, so the whole batch
//! lands atomically under one nonce.
//!
//! Multisend addresses are resolved from a static per-version deployment
//! table. A missing entry is an `UnsupportedNetwork` error, never a
//! silent default.

use alloy::primitives::{Address, Bytes, U256, address};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};

use super::error::ExecError;
use super::transaction::{ExecutionBatch, ModuleTransaction, Operation};

sol! {
    /// Safe MultiSend entry point; the packed payload is its only argument.
    function multiSend(bytes memory transactions) external payable;
}

/// Safe versions with known multisend deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafeVersion {
    #[serde(rename = "1.1.1")]
    V1_1_1,
    #[serde(rename = "1.2.0")]
    V1_2_0,
    #[serde(rename = "1.3.0")]
    V1_3_0,
}

impl std::fmt::Display for SafeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1_1_1 => write!(f, "1.1.1"),
            Self::V1_2_0 => write!(f, "1.2.0"),
            Self::V1_3_0 => write!(f, "1.3.0"),
        }
    }
}

impl std::str::FromStr for SafeVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.1.1" => Ok(Self::V1_1_1),
            "1.2.0" => Ok(Self::V1_2_0),
            "1.3.0" => Ok(Self::V1_3_0),
            other => Err(format!("unknown safe version: {other}")),
        }
    }
}

/// MultiSend used by Safe 1.1.1 and 1.2.0 deployments.
const MULTISEND_LEGACY: Address = address!("8D29bE29923b68abfDD21e541b9374737B49cdAD");
/// Canonical MultiSend shipped with Safe 1.3.0.
const MULTISEND_1_3_0: Address = address!("A238CBeb142c10Ef7Ad8442C6D1f9E89e07e7761");

/// Chains carrying the legacy (1.1.1 / 1.2.0) multisend deployment.
const LEGACY_CHAINS: &[u64] = &[1, 4, 5, 42, 56, 100, 137, 246, 73799];
/// Chains carrying the canonical 1.3.0 multisend deployment.
const V1_3_0_CHAINS: &[u64] = &[1, 5, 10, 56, 100, 137, 246, 288, 42161, 43114, 73799, 11155111];

/// Resolve the multisend contract for a `(chain, version)` pair.
pub fn multisend_address(chain_id: u64, version: SafeVersion) -> Result<Address, ExecError> {
    let (chains, addr) = match version {
        SafeVersion::V1_1_1 | SafeVersion::V1_2_0 => (LEGACY_CHAINS, MULTISEND_LEGACY),
        SafeVersion::V1_3_0 => (V1_3_0_CHAINS, MULTISEND_1_3_0),
    };

    if chains.contains(&chain_id) {
        Ok(addr)
    } else {
        Err(ExecError::UnsupportedNetwork {
            chain_id,
            artifact: "multisend",
            detail: format!("safe version {version}"),
        })
    }
}

/// Pack transactions into the multisend wire format.
///
/// Each member becomes `operation:uint8 ++ to:address ++ value:uint256 ++
/// dataLength:uint256 ++ data:bytes`, concatenated in order with no
/// padding between members.
pub fn pack_multisend(transactions: &[ModuleTransaction]) -> Bytes {
    let mut packed = Vec::with_capacity(
        transactions
            .iter()
            .map(|tx| 85 + tx.data.len())
            .sum::<usize>(),
    );

    for tx in transactions {
        packed.push(tx.operation.as_u8());
        packed.extend_from_slice(tx.to.as_slice());
        packed.extend_from_slice(&tx.value.to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(tx.data.len()).to_be_bytes::<32>());
        packed.extend_from_slice(&tx.data);
    }

    Bytes::from(packed)
}

/// Unpack a multisend payload back into its member transactions.
///
/// Used to verify a batch before signing off on its hash; strict about
/// trailing garbage and truncated members.
pub fn unpack_multisend(packed: &[u8]) -> Result<Vec<ModuleTransaction>, ExecError> {
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while cursor < packed.len() {
        if packed.len() - cursor < 85 {
            return Err(ExecError::decode("multisend", "truncated member header"));
        }

        let operation = Operation::from_u8(packed[cursor])
            .ok_or_else(|| ExecError::decode("multisend", "invalid operation byte"))?;
        cursor += 1;

        let to = Address::from_slice(&packed[cursor..cursor + 20]);
        cursor += 20;

        let value = U256::from_be_slice(&packed[cursor..cursor + 32]);
        cursor += 32;

        let data_len = U256::from_be_slice(&packed[cursor..cursor + 32]);
        cursor += 32;
        let data_len = usize::try_from(data_len)
            .map_err(|_| ExecError::decode("multisend", "data length overflow"))?;

        if packed.len() - cursor < data_len {
            return Err(ExecError::decode("multisend", "truncated member data"));
        }
        let data = Bytes::copy_from_slice(&packed[cursor..cursor + data_len]);
        cursor += data_len;

        out.push(ModuleTransaction {
            to,
            value,
            data,
            operation,
        });
    }

    Ok(out)
}

/// Collapse a batch into the single transaction the module will execute.
///
/// Length one passes through unchanged; longer batches become one
/// delegatecall to the `(chain, version)` multisend contract carrying the
/// packed payload.
pub fn encode_batch(
    chain_id: u64,
    version: SafeVersion,
    batch: &ExecutionBatch,
) -> Result<ModuleTransaction, ExecError> {
    match batch.transactions.as_slice() {
        [] => Err(ExecError::PreconditionNotMet(format!(
            "batch {} has no transactions",
            batch.nonce
        ))),
        [single] => Ok(single.clone()),
        many => {
            let packed = pack_multisend(many);
            let data = multiSendCall {
                transactions: packed,
            }
            .abi_encode();

            Ok(ModuleTransaction {
                to: multisend_address(chain_id, version)?,
                value: U256::ZERO,
                data: Bytes::from(data),
                operation: Operation::DelegateCall,
            })
        }
    }
}

/// Recover the member transactions from an encoded batch transaction.
///
/// Accepts either a pass-through single transaction (returned as-is) or a
/// multisend wrapper (unwrapped and unpacked).
pub fn decode_batch(encoded: &ModuleTransaction) -> Result<Vec<ModuleTransaction>, ExecError> {
    let is_wrapper = encoded.operation == Operation::DelegateCall
        && encoded.data.starts_with(&multiSendCall::SELECTOR);
    if !is_wrapper {
        return Ok(vec![encoded.clone()]);
    }

    let call = multiSendCall::abi_decode(&encoded.data, true)
        .map_err(|e| ExecError::decode("multiSend", e))?;
    unpack_multisend(&call.transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn sample_tx(seed: u8) -> ModuleTransaction {
        ModuleTransaction {
            to: Address::repeat_byte(seed),
            value: U256::from(seed as u64 * 1000),
            data: Bytes::from(vec![seed; seed as usize % 7 + 1]),
            operation: Operation::Call,
        }
    }

    #[test]
    fn test_single_transaction_passes_through() {
        let tx = sample_tx(3);
        let batch = ExecutionBatch::new(0, vec![tx.clone()]);
        let encoded = encode_batch(1, SafeVersion::V1_3_0, &batch).unwrap();
        assert_eq!(encoded, tx);
    }

    #[test]
    fn test_multi_transaction_targets_multisend() {
        let batch = ExecutionBatch::new(0, vec![sample_tx(1), sample_tx(2), sample_tx(3)]);
        let encoded = encode_batch(1, SafeVersion::V1_3_0, &batch).unwrap();
        assert_eq!(encoded.to, MULTISEND_1_3_0);
        assert_eq!(encoded.operation, Operation::DelegateCall);
        assert_eq!(encoded.value, U256::ZERO);
    }

    #[test]
    fn test_legacy_versions_share_a_deployment() {
        assert_eq!(
            multisend_address(1, SafeVersion::V1_1_1).unwrap(),
            multisend_address(1, SafeVersion::V1_2_0).unwrap(),
        );
    }

    #[test]
    fn test_unregistered_network_is_an_error() {
        let err = multisend_address(424242, SafeVersion::V1_3_0).unwrap_err();
        assert!(matches!(
            err,
            ExecError::UnsupportedNetwork { chain_id: 424242, .. }
        ));
    }

    #[test]
    fn test_round_trip_preserves_order_and_content() {
        let original = vec![sample_tx(1), sample_tx(2), sample_tx(3), sample_tx(4)];
        let batch = ExecutionBatch::new(2, original.clone());
        let encoded = encode_batch(100, SafeVersion::V1_3_0, &batch).unwrap();
        let decoded = decode_batch(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let batch = ExecutionBatch::new(0, vec![]);
        let err = encode_batch(1, SafeVersion::V1_3_0, &batch).unwrap_err();
        assert!(matches!(err, ExecError::PreconditionNotMet(_)));
    }

    #[test]
    fn test_unpack_rejects_truncated_payload() {
        let packed = pack_multisend(&[sample_tx(5)]);
        let err = unpack_multisend(&packed[..packed.len() - 1]).unwrap_err();
        assert!(matches!(err, ExecError::Decode(_)));
    }

    #[test]
    fn test_delegatecall_member_survives_packing() {
        let inner = ModuleTransaction {
            to: address!("00000000000000000000000000000000000000bb"),
            value: U256::ZERO,
            data: Bytes::from(vec![0xde, 0xad]),
            operation: Operation::DelegateCall,
        };
        let decoded = unpack_multisend(&pack_multisend(&[inner.clone(), sample_tx(1)])).unwrap();
        assert_eq!(decoded[0], inner);
    }
}
