//! Session Cache - Per-Account Ephemeral State
//!
//! The only local state the protocol keeps: ERC-20 allowances, the
//! one-shot oracle bond-token capability probe, and module constants read
//! once per session. Account-scoped entries are invalidated when the
//! posting account changes, not on every call. The cache is an explicit
//! object passed by reference to adapters — never ambient global state.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, U256};

use crate::domain::proposal::ModuleState;

/// Ephemeral per-session caches.
///
/// Interior mutability keeps the adapters' shared references immutable;
/// each map is locked briefly and never across an await point.
#[derive(Debug, Default)]
pub struct SessionCache {
    /// Current posting account.
    account: Mutex<Option<Address>>,
    /// `(token, spender)` -> last observed allowance for the account.
    allowances: Mutex<HashMap<(Address, Address), U256>>,
    /// Oracle -> bond-token probe result. `Some(None)` means the probe ran
    /// and the oracle takes native-asset bonds.
    bond_tokens: Mutex<HashMap<Address, Option<Address>>>,
    /// Module -> constants read once per session.
    module_states: Mutex<HashMap<Address, ModuleState>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current posting account.
    pub fn account(&self) -> Option<Address> {
        *self.account.lock().expect("account lock")
    }

    /// Switch the posting account, invalidating account-scoped entries.
    ///
    /// Module constants survive — they are chain state, not account state.
    pub fn set_account(&self, account: Option<Address>) {
        let mut current = self.account.lock().expect("account lock");
        if *current == account {
            return;
        }
        *current = account;
        self.allowances.lock().expect("allowance lock").clear();
        self.bond_tokens.lock().expect("bond token lock").clear();
    }

    /// Last observed allowance for `(token, spender)`.
    pub fn allowance(&self, token: Address, spender: Address) -> Option<U256> {
        self.allowances
            .lock()
            .expect("allowance lock")
            .get(&(token, spender))
            .copied()
    }

    /// Record an allowance observation.
    pub fn store_allowance(&self, token: Address, spender: Address, amount: U256) {
        self.allowances
            .lock()
            .expect("allowance lock")
            .insert((token, spender), amount);
    }

    /// Drop a cached allowance (after an approval broadcast, before
    /// re-reading it from chain).
    pub fn invalidate_allowance(&self, token: Address, spender: Address) {
        self.allowances
            .lock()
            .expect("allowance lock")
            .remove(&(token, spender));
    }

    /// Cached capability-probe result for an oracle, if the probe ran.
    pub fn bond_token(&self, oracle: Address) -> Option<Option<Address>> {
        self.bond_tokens
            .lock()
            .expect("bond token lock")
            .get(&oracle)
            .copied()
    }

    /// Record a capability-probe result.
    pub fn store_bond_token(&self, oracle: Address, token: Option<Address>) {
        self.bond_tokens
            .lock()
            .expect("bond token lock")
            .insert(oracle, token);
    }

    /// Cached module constants.
    pub fn module_state(&self, module: Address) -> Option<ModuleState> {
        self.module_states
            .lock()
            .expect("module state lock")
            .get(&module)
            .copied()
    }

    /// Record module constants for the session.
    pub fn store_module_state(&self, module: Address, state: ModuleState) {
        self.module_states
            .lock()
            .expect("module state lock")
            .insert(module, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Address = Address::repeat_byte(0x01);
    const SPENDER: Address = Address::repeat_byte(0x02);
    const ORACLE: Address = Address::repeat_byte(0x03);

    #[test]
    fn test_account_change_invalidates_account_scoped_entries() {
        let cache = SessionCache::new();
        cache.set_account(Some(Address::repeat_byte(0xaa)));
        cache.store_allowance(TOKEN, SPENDER, U256::from(5u64));
        cache.store_bond_token(ORACLE, Some(TOKEN));

        cache.set_account(Some(Address::repeat_byte(0xbb)));
        assert_eq!(cache.allowance(TOKEN, SPENDER), None);
        assert_eq!(cache.bond_token(ORACLE), None);
    }

    #[test]
    fn test_same_account_keeps_entries() {
        let cache = SessionCache::new();
        cache.set_account(Some(Address::repeat_byte(0xaa)));
        cache.store_allowance(TOKEN, SPENDER, U256::from(5u64));

        cache.set_account(Some(Address::repeat_byte(0xaa)));
        assert_eq!(cache.allowance(TOKEN, SPENDER), Some(U256::from(5u64)));
    }

    #[test]
    fn test_module_state_survives_account_change() {
        let cache = SessionCache::new();
        let state = ModuleState {
            oracle: ORACLE,
            bond_token: None,
            minimum_bond: U256::from(1u64),
            challenge_window_secs: 60,
        };
        cache.store_module_state(TOKEN, state);
        cache.set_account(Some(Address::repeat_byte(0xcc)));
        assert_eq!(cache.module_state(TOKEN), Some(state));
    }

    #[test]
    fn test_native_probe_result_is_distinguishable_from_unprobed() {
        let cache = SessionCache::new();
        assert_eq!(cache.bond_token(ORACLE), None);
        cache.store_bond_token(ORACLE, None);
        assert_eq!(cache.bond_token(ORACLE), Some(None));
    }
}
