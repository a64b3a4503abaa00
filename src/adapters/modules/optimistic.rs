//! Assertion Oracle Adapter - Optimistic Governor Module
//!
//! State machine for proposals authorized through an optimistic assertion
//! oracle. The whole transaction set is asserted as one claim backed by a
//! flat bond; absence of a dispute through the liveness window (or a true
//! resolution of a dispute by the external voting oracle) unlocks a single
//! atomic execution.
//!
//! The proposal hash alone is not unique across time — the module deletes
//! and re-allows hashes — so state reads cross-reference the proposal
//! events for this exact `(proposal_hash, explanation)` pair.

use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, instrument};

use crate::adapters::events::RangeFetcher;
use crate::domain::bond::{allowance_sufficient, build_approval};
use crate::domain::error::ExecError;
use crate::domain::hashing::proposal_hash;
use crate::domain::proposal::{
    AssertionPhase, ModuleState, OracleReference, Proposal, ProposalPhase,
};
use crate::domain::transaction::ModuleTransaction;
use crate::ports::gateway::{BroadcastOutcome, EvmGateway, LogQuery, TxRequest};
use crate::ports::module::ExecutionAdapter;
use crate::usecases::session::SessionCache;

use super::abi::{GovTransaction, IAssertionOracle, IERC20, IOptimisticGovernor};
use super::{decode_return, expect_success};

/// Module constants read once per session.
#[derive(Debug, Clone)]
struct GovernorConstants {
    /// Assertion oracle the module defers to.
    oracle: Address,
    /// Flat bond every assertion posts.
    bond: U256,
    /// Liveness window in seconds.
    liveness: u64,
    /// Bond currency.
    collateral: Address,
    /// Collateral display info for operator logs.
    collateral_symbol: String,
    collateral_decimals: u8,
}

/// Point-in-time view of the assertion and its liveness window.
#[derive(Debug, Clone)]
pub struct AssertionSnapshot {
    /// Content hash of the asserted transaction set.
    pub proposal_hash: B256,
    /// Live assertion id, when one exists.
    pub assertion_id: Option<B256>,
    /// When the module recorded the proposal (unix seconds).
    pub proposed_at: Option<u64>,
    /// End of the liveness window (unix seconds).
    pub expires_at: Option<u64>,
    /// Whether the assertion settled on-chain.
    pub settled: bool,
    /// Settlement outcome, once settled.
    pub resolution: Option<bool>,
    /// Whether a dispute is pending.
    pub disputed: bool,
    /// Whether this exact set already executed.
    pub executed: bool,
    /// Whether the module deleted the proposal.
    pub deleted: bool,
    /// Derived lifecycle phase.
    pub phase: AssertionPhase,
}

/// One proposal's state machine against an optimistic-governor module.
pub struct AssertionOracleAdapter {
    gateway: Arc<dyn EvmGateway>,
    session: Arc<SessionCache>,
    module: Address,
    proposal_id: String,
    /// The full transaction set, executed atomically.
    transactions: Vec<ModuleTransaction>,
    /// Human-readable justification packed into the assertion claim.
    explanation: Bytes,
    content_hash: B256,
    fetcher: RangeFetcher,
    /// Earliest block log scans consider (module deployment height).
    scan_start: u64,
    constants: tokio::sync::OnceCell<GovernorConstants>,
}

impl AssertionOracleAdapter {
    /// Build the adapter for one proposal.
    pub fn new(
        gateway: Arc<dyn EvmGateway>,
        session: Arc<SessionCache>,
        module: Address,
        proposal_id: String,
        transactions: Vec<ModuleTransaction>,
        explanation: String,
        fetcher: RangeFetcher,
        scan_start: u64,
    ) -> Self {
        let content_hash = proposal_hash(&transactions);
        Self {
            gateway,
            session,
            module,
            proposal_id,
            transactions,
            explanation: Bytes::from(explanation.into_bytes()),
            content_hash,
            fetcher,
            scan_start,
            constants: tokio::sync::OnceCell::new(),
        }
    }

    /// Content hash of the transaction set; the module's lookup key.
    pub fn content_hash(&self) -> B256 {
        self.content_hash
    }

    async fn constants(&self) -> Result<GovernorConstants, ExecError> {
        let constants = self
            .constants
            .get_or_try_init(|| self.read_constants())
            .await?;
        Ok(constants.clone())
    }

    async fn read_constants(&self) -> Result<GovernorConstants, ExecError> {
        let calls = vec![
            (
                self.module,
                Bytes::from(IOptimisticGovernor::optimisticOracleV3Call {}.abi_encode()),
            ),
            (
                self.module,
                Bytes::from(IOptimisticGovernor::bondAmountCall {}.abi_encode()),
            ),
            (
                self.module,
                Bytes::from(IOptimisticGovernor::livenessCall {}.abi_encode()),
            ),
            (
                self.module,
                Bytes::from(IOptimisticGovernor::collateralCall {}.abi_encode()),
            ),
            (
                self.module,
                Bytes::from(IOptimisticGovernor::avatarCall {}.abi_encode()),
            ),
            (
                self.module,
                Bytes::from(IOptimisticGovernor::rulesCall {}.abi_encode()),
            ),
        ];
        let outcomes = self.gateway.multicall(&calls).await?;
        if outcomes.len() != calls.len() {
            return Err(ExecError::decode("governor constants", "short multicall response"));
        }

        let oracle = decode_return::<IOptimisticGovernor::optimisticOracleV3Call>(
            expect_success(&outcomes[0], "optimisticOracleV3()")?,
            "optimisticOracleV3()",
        )?
        ._0;
        let bond = decode_return::<IOptimisticGovernor::bondAmountCall>(
            expect_success(&outcomes[1], "bondAmount()")?,
            "bondAmount()",
        )?
        ._0;
        let liveness = decode_return::<IOptimisticGovernor::livenessCall>(
            expect_success(&outcomes[2], "liveness()")?,
            "liveness()",
        )?
        ._0;
        let collateral = decode_return::<IOptimisticGovernor::collateralCall>(
            expect_success(&outcomes[3], "collateral()")?,
            "collateral()",
        )?
        ._0;
        let avatar = decode_return::<IOptimisticGovernor::avatarCall>(
            expect_success(&outcomes[4], "avatar()")?,
            "avatar()",
        )?
        ._0;
        let rules = decode_return::<IOptimisticGovernor::rulesCall>(
            expect_success(&outcomes[5], "rules()")?,
            "rules()",
        )?
        ._0;

        // Collateral display info, best effort for operator logs.
        let token_calls = vec![
            (collateral, Bytes::from(IERC20::symbolCall {}.abi_encode())),
            (collateral, Bytes::from(IERC20::decimalsCall {}.abi_encode())),
        ];
        let token_outcomes = self.gateway.multicall(&token_calls).await?;
        let collateral_symbol = token_outcomes
            .first()
            .filter(|o| o.success)
            .and_then(|o| decode_return::<IERC20::symbolCall>(&o.data, "symbol()").ok())
            .map_or_else(|| "???".to_string(), |r| r._0);
        let collateral_decimals = token_outcomes
            .get(1)
            .filter(|o| o.success)
            .and_then(|o| decode_return::<IERC20::decimalsCall>(&o.data, "decimals()").ok())
            .map_or(18, |r| r._0);

        self.session.store_module_state(
            self.module,
            ModuleState {
                oracle,
                bond_token: Some(collateral),
                minimum_bond: bond,
                challenge_window_secs: liveness,
            },
        );

        debug!(
            oracle = %oracle,
            avatar = %avatar,
            bond = %bond,
            liveness,
            collateral = %collateral,
            symbol = %collateral_symbol,
            rules_len = rules.len(),
            "Module constants read"
        );

        Ok(GovernorConstants {
            oracle,
            bond,
            liveness,
            collateral,
            collateral_symbol,
            collateral_decimals,
        })
    }

    /// Bond amount and collateral, formatted for operator logs.
    pub async fn bond_display(&self) -> Result<String, ExecError> {
        let constants = self.constants().await?;
        let whole = U256::from(10u64).pow(U256::from(constants.collateral_decimals));
        Ok(format!(
            "{} {} (wei {})",
            constants.bond / whole,
            constants.collateral_symbol,
            constants.bond
        ))
    }

    /// Read assertion state, cross-referencing proposal events.
    #[instrument(skip(self), fields(proposal = %self.proposal_id))]
    pub async fn read_state(&self) -> Result<AssertionSnapshot, ExecError> {
        let constants = self.constants().await?;

        let calls = vec![
            (
                self.module,
                Bytes::from(
                    IOptimisticGovernor::proposalHashesCall {
                        proposalHash: self.content_hash,
                    }
                    .abi_encode(),
                ),
            ),
            (
                self.module,
                Bytes::from(
                    IOptimisticGovernor::assertionIdsCall {
                        proposalHash: self.content_hash,
                    }
                    .abi_encode(),
                ),
            ),
        ];
        let outcomes = self.gateway.multicall(&calls).await?;
        if outcomes.len() != calls.len() {
            return Err(ExecError::decode("proposal state", "short multicall response"));
        }

        let proposed_at_raw = decode_return::<IOptimisticGovernor::proposalHashesCall>(
            expect_success(&outcomes[0], "proposalHashes()")?,
            "proposalHashes()",
        )?
        ._0;
        let assertion_id_raw = decode_return::<IOptimisticGovernor::assertionIdsCall>(
            expect_success(&outcomes[1], "assertionIds()")?,
            "assertionIds()",
        )?
        ._0;

        let proposed_at = (!proposed_at_raw.is_zero()).then(|| proposed_at_raw.to::<u64>());
        let assertion_id = (assertion_id_raw != B256::ZERO).then_some(assertion_id_raw);

        // The module mapping only proves *some* proposal with this hash;
        // the events pin down whether it is ours (same explanation) and
        // whether it already executed or was deleted.
        let events = self.proposal_events().await?;

        let (mut settled, mut resolution, mut disputed, mut expires_at) =
            (false, None, false, None);

        if let Some(id) = assertion_id {
            let raw = self
                .gateway
                .call(
                    constants.oracle,
                    Bytes::from(IAssertionOracle::getAssertionCall { assertionId: id }.abi_encode()),
                )
                .await
                .map_err(ExecError::Gateway)?;
            let assertion =
                decode_return::<IAssertionOracle::getAssertionCall>(&raw, "getAssertion()")?._0;

            settled = assertion.settled;
            resolution = settled.then_some(assertion.settlementResolution);
            disputed = assertion.disputer != Address::ZERO;
            expires_at = Some(assertion.expirationTime);
        } else if let Some(at) = proposed_at {
            expires_at = Some(at.saturating_add(constants.liveness));
        }

        if let Some(block) = events.proposed_at_block {
            debug!(block, "Proposal event confirmed for this explanation");
        }

        let now = Utc::now().timestamp().max(0) as u64;
        let phase = if events.executed {
            AssertionPhase::Executed
        } else if proposed_at.is_none() {
            if events.deleted {
                AssertionPhase::Invalid
            } else {
                AssertionPhase::Requested
            }
        } else if disputed && !settled {
            AssertionPhase::Disputed
        } else if settled {
            AssertionPhase::Settled
        } else if expires_at.is_some_and(|deadline| now >= deadline) {
            AssertionPhase::Expired
        } else {
            AssertionPhase::Proposed
        };

        Ok(AssertionSnapshot {
            proposal_hash: self.content_hash,
            assertion_id,
            proposed_at,
            expires_at,
            settled,
            resolution,
            disputed,
            executed: events.executed,
            deleted: events.deleted,
            phase,
        })
    }

    /// Submit the transaction set for assertion.
    ///
    /// The flat module bond must be approved and funded before broadcast;
    /// shortfalls fail here, not as on-chain reverts.
    #[instrument(skip(self), fields(proposal = %self.proposal_id))]
    pub async fn propose(&self) -> Result<Option<BroadcastOutcome>, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;

        if snapshot.proposed_at.is_some() {
            debug!(hash = %self.content_hash, "Transaction set already proposed");
            return Ok(None);
        }
        if snapshot.executed {
            return Err(ExecError::PreconditionNotMet(
                "transaction set already executed".into(),
            ));
        }

        let account = self.account()?;
        let (allowance, balance) = self
            .collateral_position(&constants, account, self.module)
            .await?;
        if !allowance_sufficient(allowance, constants.bond) {
            return Err(ExecError::InsufficientAllowance {
                required: constants.bond,
                allowance,
            });
        }
        if balance < constants.bond {
            return Err(ExecError::InsufficientBond {
                required: constants.bond,
                balance,
            });
        }

        let data = IOptimisticGovernor::proposeTransactionsCall {
            transactions: self.gov_transactions(),
            explanation: self.explanation.clone(),
        }
        .abi_encode();

        let outcome = self
            .broadcast(self.module, data, "proposeTransactions")
            .await?;
        info!(tx = %outcome.tx_hash, hash = %self.content_hash, "Transaction set asserted");
        Ok(Some(outcome))
    }

    /// Approval transaction for the assertion bond, if still needed.
    pub async fn approval_for_bond(&self) -> Result<Option<ModuleTransaction>, ExecError> {
        let constants = self.constants().await?;
        let account = self.account()?;
        let (allowance, _) = self
            .collateral_position(&constants, account, self.module)
            .await?;
        if allowance_sufficient(allowance, constants.bond) {
            return Ok(None);
        }
        Ok(Some(build_approval(
            constants.collateral,
            self.module,
            constants.bond,
        )))
    }

    /// Challenge the assertion while its liveness window is open.
    ///
    /// Resolution after a dispute is external (the voting oracle) and is
    /// observed asynchronously through `read_state`.
    #[instrument(skip(self), fields(proposal = %self.proposal_id))]
    pub async fn dispute_assertion(&self) -> Result<BroadcastOutcome, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;

        let Some(assertion_id) = snapshot.assertion_id else {
            return Err(ExecError::PreconditionNotMet(
                "nothing to dispute: no live assertion".into(),
            ));
        };
        if snapshot.phase != AssertionPhase::Proposed {
            return Err(ExecError::PreconditionNotMet(format!(
                "assertion is {}; disputes are accepted only while proposed",
                snapshot.phase
            )));
        }

        // The disputer posts the same bond to the oracle.
        let account = self.account()?;
        let (allowance, balance) = self
            .collateral_position(&constants, account, constants.oracle)
            .await?;
        if !allowance_sufficient(allowance, constants.bond) {
            return Err(ExecError::InsufficientAllowance {
                required: constants.bond,
                allowance,
            });
        }
        if balance < constants.bond {
            return Err(ExecError::InsufficientBond {
                required: constants.bond,
                balance,
            });
        }

        let data = IAssertionOracle::disputeAssertionCall {
            assertionId: assertion_id,
            disputer: account,
        }
        .abi_encode();
        self.broadcast(constants.oracle, data, "disputeAssertion")
            .await
    }

    /// Settle an assertion whose outcome is decided (expired or resolved).
    pub async fn settle(&self) -> Result<BroadcastOutcome, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;

        let Some(assertion_id) = snapshot.assertion_id else {
            return Err(ExecError::PreconditionNotMet("no live assertion".into()));
        };
        if snapshot.settled {
            return Err(ExecError::PreconditionNotMet("already settled".into()));
        }
        if snapshot.phase == AssertionPhase::Proposed {
            return Err(ExecError::PreconditionNotMet(
                "liveness window still open".into(),
            ));
        }

        let data = IAssertionOracle::settleAssertionCall {
            assertionId: assertion_id,
        }
        .abi_encode();
        self.broadcast(constants.oracle, data, "settleAssertion")
            .await
    }

    /// Execute the full transaction set atomically.
    ///
    /// Allowed once the liveness window lapsed unchallenged, or after a
    /// disputed assertion settled with a true resolution. There is no
    /// partial execution.
    #[instrument(skip(self), fields(proposal = %self.proposal_id))]
    pub async fn execute_all(&self) -> Result<BroadcastOutcome, ExecError> {
        let snapshot = self.read_state().await?;

        if snapshot.executed {
            return Err(ExecError::PreconditionNotMet(
                "transaction set already executed".into(),
            ));
        }
        let ready = matches!(snapshot.phase, AssertionPhase::Expired)
            || (snapshot.settled && snapshot.resolution == Some(true));
        if !ready {
            return Err(ExecError::PreconditionNotMet(format!(
                "assertion is {}; execution requires an expired or truthfully resolved assertion",
                snapshot.phase
            )));
        }

        let data = IOptimisticGovernor::executeProposalCall {
            transactions: self.gov_transactions(),
        }
        .abi_encode();

        let outcome = self.broadcast(self.module, data, "executeProposal").await?;
        info!(tx = %outcome.tx_hash, "Transaction set executed");
        Ok(outcome)
    }

    /// Liveness deadline as a wall-clock timestamp, for operator logs.
    pub async fn challenge_deadline(&self) -> Result<Option<DateTime<Utc>>, ExecError> {
        let snapshot = self.read_state().await?;
        Ok(snapshot
            .expires_at
            .and_then(|t| Utc.timestamp_opt(t as i64, 0).single()))
    }

    /// Sweep module events for this exact `(hash, explanation)` pair.
    async fn proposal_events(&self) -> Result<ProposalEvents, ExecError> {
        let latest = self.gateway.block_number().await?;
        let module = self.module;

        let logs = self
            .fetcher
            .fetch_all(self.scan_start, latest, |from, to| {
                let gateway = Arc::clone(&self.gateway);
                async move {
                    gateway
                        .get_logs(&LogQuery {
                            address: module,
                            topics: Vec::new(),
                            from_block: from,
                            to_block: to,
                        })
                        .await
                }
            })
            .await?;

        let mut events = ProposalEvents::default();
        for log in &logs {
            let Some(signature) = log.topics.first() else {
                continue;
            };

            if *signature == IOptimisticGovernor::TransactionsProposed::SIGNATURE_HASH {
                let event = IOptimisticGovernor::TransactionsProposed::decode_raw_log(
                    log.topics.iter().copied(),
                    &log.data,
                    true,
                )
                .map_err(|e| ExecError::decode("TransactionsProposed", e))?;
                // Hash alone is ambiguous across time; require our
                // explanation too.
                if event.proposalHash == self.content_hash
                    && event.explanation == self.explanation
                {
                    events.proposed_at_block = Some(log.block_number);
                }
            } else if *signature == IOptimisticGovernor::ProposalExecuted::SIGNATURE_HASH {
                let event = IOptimisticGovernor::ProposalExecuted::decode_raw_log(
                    log.topics.iter().copied(),
                    &log.data,
                    true,
                )
                .map_err(|e| ExecError::decode("ProposalExecuted", e))?;
                if event.proposalHash == self.content_hash {
                    events.executed = true;
                }
            } else if *signature == IOptimisticGovernor::ProposalDeleted::SIGNATURE_HASH {
                let event = IOptimisticGovernor::ProposalDeleted::decode_raw_log(
                    log.topics.iter().copied(),
                    &log.data,
                    true,
                )
                .map_err(|e| ExecError::decode("ProposalDeleted", e))?;
                if event.proposalHash == self.content_hash {
                    events.deleted = true;
                }
            }
        }

        Ok(events)
    }

    fn gov_transactions(&self) -> Vec<GovTransaction> {
        self.transactions
            .iter()
            .map(|tx| GovTransaction {
                to: tx.to,
                operation: tx.operation.as_u8(),
                value: tx.value,
                data: tx.data.clone(),
            })
            .collect()
    }

    fn account(&self) -> Result<Address, ExecError> {
        self.gateway.account().ok_or_else(|| {
            ExecError::PreconditionNotMet("no posting account configured".into())
        })
    }

    /// `(allowance, balance)` of the collateral for `account` toward `spender`.
    async fn collateral_position(
        &self,
        constants: &GovernorConstants,
        account: Address,
        spender: Address,
    ) -> Result<(U256, U256), ExecError> {
        let calls = vec![
            (
                constants.collateral,
                Bytes::from(
                    IERC20::allowanceCall {
                        owner: account,
                        spender,
                    }
                    .abi_encode(),
                ),
            ),
            (
                constants.collateral,
                Bytes::from(IERC20::balanceOfCall { owner: account }.abi_encode()),
            ),
        ];
        let outcomes = self.gateway.multicall(&calls).await?;
        if outcomes.len() != calls.len() {
            return Err(ExecError::decode("collateral position", "short multicall response"));
        }

        let allowance = decode_return::<IERC20::allowanceCall>(
            expect_success(&outcomes[0], "allowance()")?,
            "allowance()",
        )?
        ._0;
        let balance = decode_return::<IERC20::balanceOfCall>(
            expect_success(&outcomes[1], "balanceOf()")?,
            "balanceOf()",
        )?
        ._0;

        self.session
            .store_allowance(constants.collateral, spender, allowance);
        Ok((allowance, balance))
    }

    async fn broadcast(
        &self,
        to: Address,
        data: Vec<u8>,
        what: &str,
    ) -> Result<BroadcastOutcome, ExecError> {
        let outcome = self
            .gateway
            .send_transaction(&TxRequest::call(to, Bytes::from(data)))
            .await?;

        if !outcome.success {
            return Err(ExecError::BroadcastReverted(format!(
                "{what} ({})",
                outcome
                    .revert_reason
                    .as_deref()
                    .unwrap_or("no reason reported")
            )));
        }
        Ok(outcome)
    }
}

/// What the module's event history says about this exact proposal.
#[derive(Debug, Default)]
struct ProposalEvents {
    proposed_at_block: Option<u64>,
    executed: bool,
    deleted: bool,
}

#[async_trait]
impl ExecutionAdapter for AssertionOracleAdapter {
    async fn propose(&self) -> Result<Option<BroadcastOutcome>, ExecError> {
        Self::propose(self).await
    }

    async fn dispute(&self) -> Result<BroadcastOutcome, ExecError> {
        self.dispute_assertion().await
    }

    async fn execute(&self, step: usize) -> Result<BroadcastOutcome, ExecError> {
        if step != 0 {
            return Err(ExecError::PreconditionNotMet(format!(
                "assertion proposals execute as one step; step {step} does not exist"
            )));
        }
        self.execute_all().await
    }

    async fn refresh(&self) -> Result<Proposal, ExecError> {
        let snapshot = self.read_state().await?;
        Ok(Proposal {
            proposal_id: self.proposal_id.clone(),
            batch_hashes: vec![self.content_hash],
            oracle_reference: snapshot.assertion_id.map(OracleReference::Assertion),
            submitted_at: snapshot
                .proposed_at
                .and_then(|t| Utc.timestamp_opt(t as i64, 0).single()),
            phase: ProposalPhase::Assertion(snapshot.phase),
        })
    }

    async fn next_step(&self) -> Result<Option<usize>, ExecError> {
        let snapshot = self.read_state().await?;
        let ready = !snapshot.executed
            && (matches!(snapshot.phase, AssertionPhase::Expired)
                || (snapshot.settled && snapshot.resolution == Some(true)));
        Ok(ready.then_some(0))
    }

    fn step_count(&self) -> usize {
        1
    }
}
