//! Bond escalation and allowance accounting.
//!
//! The market oracle prices each successive answer at double the standing
//! bond, so challenges get monotonically more expensive. The assertion
//! module uses a flat bond read from the module instead; only the
//! escalation rule here is specific to the market oracle.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};

use super::transaction::ModuleTransaction;

sol! {
    function approve(address spender, uint256 amount) external returns (bool);
}

/// Snapshot of the posting account's bond position for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bond {
    /// Bond currently backing the standing answer (zero before the first).
    pub current: U256,
    /// Bond the next answer must post.
    pub required_next: U256,
    /// Posting account's allowance toward the oracle (ERC-20 bonds only).
    pub allowance: U256,
    /// Posting account's token balance.
    pub balance: U256,
}

/// Bond required for the next answer.
///
/// First answer: the module minimum, or one whole token when the module
/// sets no minimum. Every later answer: double the standing bond. The
/// sequence is monotonically non-decreasing across challenge rounds.
pub fn required_bond(current: U256, minimum: U256, decimals: u8) -> U256 {
    if current.is_zero() {
        if minimum.is_zero() {
            U256::from(10u64).pow(U256::from(decimals))
        } else {
            minimum
        }
    } else {
        current << 1
    }
}

/// Whether an allowance covers a required bond.
pub fn allowance_sufficient(allowance: U256, required: U256) -> bool {
    allowance >= required
}

/// Build the ERC-20 `approve` transaction a bonded write needs first.
///
/// The caller broadcasts this, waits for inclusion, and re-checks the
/// allowance before the bonded write; there is no atomic approve-and-call
/// path.
pub fn build_approval(token: Address, spender: Address, amount: U256) -> ModuleTransaction {
    ModuleTransaction::call(
        token,
        Bytes::from(approveCall { spender, amount }.abi_encode()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_first_bond_defaults_to_one_whole_token() {
        assert_eq!(
            required_bond(U256::ZERO, U256::ZERO, 18),
            U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(
            required_bond(U256::ZERO, U256::ZERO, 6),
            U256::from(1_000_000u64)
        );
    }

    #[test]
    fn test_first_bond_uses_module_minimum() {
        let minimum = U256::from(5_000u64);
        assert_eq!(required_bond(U256::ZERO, minimum, 18), minimum);
    }

    #[test]
    fn test_escalation_doubles_standing_bond() {
        let current = U256::from(12_345u64);
        assert_eq!(required_bond(current, U256::ZERO, 18), current * U256::from(2u64));
        // Minimum is irrelevant once a bond stands.
        assert_eq!(
            required_bond(current, U256::from(999_999u64), 6),
            current * U256::from(2u64)
        );
    }

    #[test]
    fn test_allowance_boundary() {
        let required = U256::from(100u64);
        assert!(allowance_sufficient(required, required));
        assert!(!allowance_sufficient(required - U256::from(1u64), required));
    }

    #[test]
    fn test_approval_transaction_shape() {
        let token = address!("00000000000000000000000000000000000000aa");
        let spender = address!("00000000000000000000000000000000000000bb");
        let tx = build_approval(token, spender, U256::from(42u64));

        assert_eq!(tx.to, token);
        assert_eq!(tx.value, U256::ZERO);
        let decoded = approveCall::abi_decode(&tx.data, true).unwrap();
        assert_eq!(decoded.spender, spender);
        assert_eq!(decoded.amount, U256::from(42u64));
    }
}
