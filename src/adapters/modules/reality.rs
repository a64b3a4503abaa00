//! Reasoned Oracle Adapter - Binary-Question Market Module
//!
//! State machine for proposals authorized through a Reality-style market
//! oracle. A proposal becomes a question; bonded answers and counter
//! answers escalate until the question finalizes; an approving final
//! answer unlocks batch-by-batch execution in strict nonce order.
//!
//! Every precondition is checked client-side before a broadcast. On-chain
//! reverts are surfaced verbatim and never retried.

use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::adapters::events::RangeFetcher;
use crate::domain::batch::SafeVersion;
use crate::domain::bond::{Bond, allowance_sufficient, build_approval, required_bond};
use crate::domain::error::ExecError;
use crate::domain::proposal::{
    DisputeHistoryEntry, ModuleState, OracleReference, Proposal, ProposalPhase, ReasonedPhase,
};
use crate::domain::transaction::{ExecutionBatch, ModuleTransaction};
use crate::domain::{encode_batch, transaction_hashes};
use crate::ports::gateway::{BroadcastOutcome, EvmGateway, LogQuery, TxRequest};
use crate::ports::module::ExecutionAdapter;
use crate::usecases::session::SessionCache;

use super::abi::{IRealityModule, IRealityOracle};
use super::{decode_return, expect_success};

/// Question-part separator the module uses when assembling the question
/// string from the proposal id and transaction hashes.
const QUESTION_SEPARATOR: char = '\u{241f}';

/// Final answer approving execution.
const ANSWER_YES: B256 = B256::with_last_byte(1);
/// Oracle sentinel for an invalid question outcome.
const ANSWER_INVALID: B256 = B256::repeat_byte(0xff);

/// Module constants read once per session.
#[derive(Debug, Clone, Copy)]
struct RealityConstants {
    /// The market oracle the module defers to.
    oracle: Address,
    /// Seconds after finalization before execution unlocks.
    cooldown: u64,
    /// Seconds after finalization until an approval goes stale
    /// (zero = never).
    expiration: u64,
    /// Module-enforced minimum bond for the first answer.
    minimum_bond: U256,
    /// Bond currency; `None` when the oracle takes native-asset bonds.
    bond_token: Option<Address>,
}

/// Point-in-time view of the question and execution progress.
#[derive(Debug, Clone)]
pub struct RealitySnapshot {
    /// Question id assigned by the oracle (zero when not proposed).
    pub question_id: B256,
    /// Execution flag per batch, nonce order.
    pub executed: Vec<bool>,
    /// Next batch that may execute, if any remain.
    pub next_executable_index: Option<usize>,
    /// Whether the question has finalized.
    pub finalized: bool,
    /// Final approval, known only once finalized.
    pub approved: Option<bool>,
    /// Standing best answer.
    pub best_answer: B256,
    /// Bond backing the standing answer.
    pub bond: U256,
    /// Finalization timestamp (unix seconds; future while pending).
    pub finalize_ts: u64,
    /// Head of the answer-history chain.
    pub history_hash: B256,
    /// Derived lifecycle phase.
    pub phase: ReasonedPhase,
}

impl RealitySnapshot {
    fn no_proposal(batch_count: usize) -> Self {
        Self {
            question_id: B256::ZERO,
            executed: vec![false; batch_count],
            next_executable_index: None,
            finalized: false,
            approved: None,
            best_answer: B256::ZERO,
            bond: U256::ZERO,
            finalize_ts: 0,
            history_hash: B256::ZERO,
            phase: ReasonedPhase::NoProposal,
        }
    }
}

/// One proposal's state machine against a Reality-style module.
pub struct ReasonedOracleAdapter {
    gateway: Arc<dyn EvmGateway>,
    session: Arc<SessionCache>,
    module: Address,
    proposal_id: String,
    /// One encoded transaction per batch, nonce order.
    transactions: Vec<ModuleTransaction>,
    /// Typed hash per batch transaction, nonce order.
    tx_hashes: Vec<B256>,
    fetcher: RangeFetcher,
    /// Earliest block log scans consider (module deployment height).
    scan_start: u64,
    constants: tokio::sync::OnceCell<RealityConstants>,
}

impl ReasonedOracleAdapter {
    /// Build the adapter for one proposal, encoding its batches.
    pub fn new(
        gateway: Arc<dyn EvmGateway>,
        session: Arc<SessionCache>,
        chain_id: u64,
        module: Address,
        safe_version: SafeVersion,
        proposal_id: String,
        batches: &[ExecutionBatch],
        fetcher: RangeFetcher,
        scan_start: u64,
    ) -> Result<Self, ExecError> {
        let transactions = batches
            .iter()
            .map(|batch| encode_batch(chain_id, safe_version, batch))
            .collect::<Result<Vec<_>, _>>()?;
        let tx_hashes = transaction_hashes(chain_id, module, &transactions);

        Ok(Self {
            gateway,
            session,
            module,
            proposal_id,
            transactions,
            tx_hashes,
            fetcher,
            scan_start,
            constants: tokio::sync::OnceCell::new(),
        })
    }

    /// The question string committed to the oracle.
    ///
    /// Deterministic: proposal id and the typed batch hashes joined with
    /// the module's separator. The question id is derived on-chain from
    /// `(question, nonce = 0)`.
    pub fn question(&self) -> String {
        let hashes = self
            .tx_hashes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{QUESTION_SEPARATOR}{}", self.proposal_id, hashes)
    }

    /// keccak256 of the question string; the module's lookup key.
    pub fn question_hash(&self) -> B256 {
        keccak256(self.question().as_bytes())
    }

    /// Typed batch hashes, nonce order.
    pub fn batch_hashes(&self) -> &[B256] {
        &self.tx_hashes
    }

    /// Read module constants once, probing the oracle's bond currency.
    async fn constants(&self) -> Result<RealityConstants, ExecError> {
        let constants = self
            .constants
            .get_or_try_init(|| self.read_constants())
            .await?;
        Ok(*constants)
    }

    async fn read_constants(&self) -> Result<RealityConstants, ExecError> {
        let calls = vec![
            (self.module, Bytes::from(IRealityModule::oracleCall {}.abi_encode())),
            (
                self.module,
                Bytes::from(IRealityModule::questionCooldownCall {}.abi_encode()),
            ),
            (
                self.module,
                Bytes::from(IRealityModule::answerExpirationCall {}.abi_encode()),
            ),
            (
                self.module,
                Bytes::from(IRealityModule::minimumBondCall {}.abi_encode()),
            ),
            (self.module, Bytes::from(IRealityModule::avatarCall {}.abi_encode())),
        ];
        let outcomes = self.gateway.multicall(&calls).await?;
        if outcomes.len() != calls.len() {
            return Err(ExecError::decode("module constants", "short multicall response"));
        }

        let oracle = decode_return::<IRealityModule::oracleCall>(
            expect_success(&outcomes[0], "oracle()")?,
            "oracle()",
        )?
        ._0;
        let cooldown = decode_return::<IRealityModule::questionCooldownCall>(
            expect_success(&outcomes[1], "questionCooldown()")?,
            "questionCooldown()",
        )?
        ._0;
        let expiration = decode_return::<IRealityModule::answerExpirationCall>(
            expect_success(&outcomes[2], "answerExpiration()")?,
            "answerExpiration()",
        )?
        ._0;
        let minimum_bond = decode_return::<IRealityModule::minimumBondCall>(
            expect_success(&outcomes[3], "minimumBond()")?,
            "minimumBond()",
        )?
        ._0;
        let avatar = decode_return::<IRealityModule::avatarCall>(
            expect_success(&outcomes[4], "avatar()")?,
            "avatar()",
        )?
        ._0;

        let bond_token = self.probe_bond_token(oracle).await?;

        let state = ModuleState {
            oracle,
            bond_token,
            minimum_bond,
            challenge_window_secs: u64::from(cooldown),
        };
        self.session.store_module_state(self.module, state);

        debug!(
            oracle = %oracle,
            avatar = %avatar,
            cooldown,
            minimum_bond = %minimum_bond,
            bond_token = ?bond_token,
            "Module constants read"
        );

        Ok(RealityConstants {
            oracle,
            cooldown: u64::from(cooldown),
            expiration: u64::from(expiration),
            minimum_bond,
            bond_token,
        })
    }

    /// One-shot capability probe: does the oracle bond in an ERC-20?
    ///
    /// A successful `token()` call means ERC-20 bonds; a failed call means
    /// native-asset bonds. The probe result is data, cached per oracle and
    /// never re-run on a hot path.
    async fn probe_bond_token(&self, oracle: Address) -> Result<Option<Address>, ExecError> {
        if let Some(cached) = self.session.bond_token(oracle) {
            return Ok(cached);
        }

        let calls = vec![(oracle, Bytes::from(IRealityOracle::tokenCall {}.abi_encode()))];
        let outcomes = self.gateway.multicall(&calls).await?;
        let probed = match outcomes.first() {
            Some(outcome) if outcome.success && outcome.data.len() >= 32 => Some(
                decode_return::<IRealityOracle::tokenCall>(&outcome.data, "token()")?._0,
            ),
            _ => None,
        };

        self.session.store_bond_token(oracle, probed);
        Ok(probed)
    }

    /// Read the full question + execution state in two aggregated rounds.
    ///
    /// Round one hits the module: slot zero is the question id, the
    /// remaining slots are the per-batch executed flags (offset by one).
    /// Round two hits the oracle, keyed by the question id.
    #[instrument(skip(self), fields(proposal = %self.proposal_id))]
    pub async fn read_state(&self) -> Result<RealitySnapshot, ExecError> {
        let constants = self.constants().await?;
        let question_hash = self.question_hash();

        let mut calls: Vec<(Address, Bytes)> = Vec::with_capacity(1 + self.tx_hashes.len());
        calls.push((
            self.module,
            Bytes::from(IRealityModule::questionIdsCall { questionHash: question_hash }.abi_encode()),
        ));
        for tx_hash in &self.tx_hashes {
            calls.push((
                self.module,
                Bytes::from(
                    IRealityModule::executedProposalTransactionsCall {
                        questionHash: question_hash,
                        txHash: *tx_hash,
                    }
                    .abi_encode(),
                ),
            ));
        }

        let outcomes = self.gateway.multicall(&calls).await?;
        if outcomes.len() != calls.len() {
            return Err(ExecError::decode("question state", "short multicall response"));
        }

        let question_id = decode_return::<IRealityModule::questionIdsCall>(
            expect_success(&outcomes[0], "questionIds()")?,
            "questionIds()",
        )?
        ._0;

        if question_id == B256::ZERO {
            return Ok(RealitySnapshot::no_proposal(self.tx_hashes.len()));
        }

        // Executed flags live one slot past the question id.
        let mut executed = Vec::with_capacity(self.tx_hashes.len());
        for (i, outcome) in outcomes[1..].iter().enumerate() {
            executed.push(
                decode_return::<IRealityModule::executedProposalTransactionsCall>(
                    expect_success(outcome, "executedProposalTransactions()")?,
                    "executedProposalTransactions()",
                )
                .map_err(|e| ExecError::decode(&format!("executed flag {i}"), e))?
                ._0,
            );
        }
        let next_executable_index = executed.iter().position(|done| !done);

        let oracle = constants.oracle;
        let oracle_calls = vec![
            (
                oracle,
                Bytes::from(IRealityOracle::resultForCall { questionId: question_id }.abi_encode()),
            ),
            (
                oracle,
                Bytes::from(IRealityOracle::getFinalizeTSCall { questionId: question_id }.abi_encode()),
            ),
            (
                oracle,
                Bytes::from(IRealityOracle::getBondCall { questionId: question_id }.abi_encode()),
            ),
            (
                oracle,
                Bytes::from(IRealityOracle::isFinalizedCall { questionId: question_id }.abi_encode()),
            ),
            (
                oracle,
                Bytes::from(IRealityOracle::getBestAnswerCall { questionId: question_id }.abi_encode()),
            ),
            (
                oracle,
                Bytes::from(IRealityOracle::getHistoryHashCall { questionId: question_id }.abi_encode()),
            ),
        ];
        let oracle_outcomes = self.gateway.multicall(&oracle_calls).await?;
        if oracle_outcomes.len() != oracle_calls.len() {
            return Err(ExecError::decode("oracle state", "short multicall response"));
        }

        // resultFor reverts until the question finalizes; that failure is
        // information, not an error.
        let result = oracle_outcomes[0]
            .success
            .then(|| {
                decode_return::<IRealityOracle::resultForCall>(
                    &oracle_outcomes[0].data,
                    "resultFor()",
                )
                .map(|r| r._0)
            })
            .transpose()?;

        let finalize_ts = u64::from(
            decode_return::<IRealityOracle::getFinalizeTSCall>(
                expect_success(&oracle_outcomes[1], "getFinalizeTS()")?,
                "getFinalizeTS()",
            )?
            ._0,
        );
        let bond = decode_return::<IRealityOracle::getBondCall>(
            expect_success(&oracle_outcomes[2], "getBond()")?,
            "getBond()",
        )?
        ._0;
        let finalized = decode_return::<IRealityOracle::isFinalizedCall>(
            expect_success(&oracle_outcomes[3], "isFinalized()")?,
            "isFinalized()",
        )?
        ._0;
        let best_answer = decode_return::<IRealityOracle::getBestAnswerCall>(
            expect_success(&oracle_outcomes[4], "getBestAnswer()")?,
            "getBestAnswer()",
        )?
        ._0;
        let history_hash = decode_return::<IRealityOracle::getHistoryHashCall>(
            expect_success(&oracle_outcomes[5], "getHistoryHash()")?,
            "getHistoryHash()",
        )?
        ._0;

        let approved = finalized.then(|| result.unwrap_or(best_answer) == ANSWER_YES);

        let executed_count = executed.iter().filter(|done| **done).count();
        let phase = if next_executable_index.is_none() {
            ReasonedPhase::FullyExecuted
        } else if finalized {
            if executed_count > 0 {
                ReasonedPhase::PartiallyExecuted(executed_count)
            } else {
                ReasonedPhase::Finalized
            }
        } else if history_hash == B256::ZERO {
            ReasonedPhase::Proposed
        } else if bond > required_bond(U256::ZERO, constants.minimum_bond, 18) {
            // The standing bond exceeds the opening requirement, so at
            // least one escalation round happened.
            ReasonedPhase::Disputed
        } else {
            ReasonedPhase::AnswerPending
        };

        Ok(RealitySnapshot {
            question_id,
            executed,
            next_executable_index,
            finalized,
            approved,
            best_answer,
            bond,
            finalize_ts,
            history_hash,
            phase,
        })
    }

    /// Submit the proposal to the module.
    ///
    /// Idempotent on `(proposal_id, batch_hashes)`: when the question
    /// already exists the resubmission is skipped and observed through the
    /// same question id.
    #[instrument(skip(self), fields(proposal = %self.proposal_id))]
    pub async fn propose(&self) -> Result<Option<BroadcastOutcome>, ExecError> {
        let snapshot = self.read_state().await?;
        if snapshot.question_id != B256::ZERO {
            debug!(question_id = %snapshot.question_id, "Proposal already on-chain");
            return Ok(None);
        }

        let data = IRealityModule::addProposalCall {
            proposalId: self.proposal_id.clone(),
            txHashes: self.tx_hashes.clone(),
        }
        .abi_encode();

        let outcome = self
            .broadcast(self.module, U256::ZERO, data, "addProposal")
            .await?;
        info!(tx = %outcome.tx_hash, "Proposal submitted");
        Ok(Some(outcome))
    }

    /// Current bond position for the posting account.
    pub async fn bond_status(&self) -> Result<Bond, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;
        let account = self.account()?;

        let (decimals, allowance, balance) = match constants.bond_token {
            Some(token) => self.erc20_position(token, constants.oracle, account).await?,
            // Native bonds have no allowance concept.
            None => (18, U256::MAX, U256::MAX),
        };

        Ok(Bond {
            current: snapshot.bond,
            required_next: required_bond(snapshot.bond, constants.minimum_bond, decimals),
            allowance,
            balance,
        })
    }

    /// Approval transaction the next bonded answer needs, if any.
    ///
    /// `None` when the oracle bonds in the native asset or the standing
    /// allowance already covers the requirement.
    pub async fn approval_for_next_answer(&self) -> Result<Option<ModuleTransaction>, ExecError> {
        let constants = self.constants().await?;
        let Some(token) = constants.bond_token else {
            return Ok(None);
        };
        let bond = self.bond_status().await?;
        if allowance_sufficient(bond.allowance, bond.required_next) {
            return Ok(None);
        }
        Ok(Some(build_approval(token, constants.oracle, bond.required_next)))
    }

    /// Post a bonded answer; `true` approves execution.
    ///
    /// The bond escalates per the doubling rule. Routed to the ERC-20 or
    /// native entry point based on the cached capability probe; allowance
    /// and balance shortfalls fail before anything is broadcast.
    #[instrument(skip(self), fields(proposal = %self.proposal_id, answer))]
    pub async fn submit_answer(&self, answer: bool) -> Result<BroadcastOutcome, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;

        if snapshot.question_id == B256::ZERO {
            return Err(ExecError::PreconditionNotMet(
                "cannot answer before the proposal is on-chain".into(),
            ));
        }
        if snapshot.finalized {
            return Err(ExecError::PreconditionNotMet(
                "question already finalized".into(),
            ));
        }

        let answer_bytes = if answer { ANSWER_YES } else { B256::ZERO };
        let max_previous = snapshot.bond;

        match constants.bond_token {
            Some(token) => {
                let account = self.account()?;
                let (decimals, allowance, balance) =
                    self.erc20_position(token, constants.oracle, account).await?;
                let required = required_bond(snapshot.bond, constants.minimum_bond, decimals);

                if !allowance_sufficient(allowance, required) {
                    return Err(ExecError::InsufficientAllowance { required, allowance });
                }
                if balance < required {
                    return Err(ExecError::InsufficientBond { required, balance });
                }

                let data = IRealityOracle::submitAnswerERC20Call {
                    questionId: snapshot.question_id,
                    answer: answer_bytes,
                    maxPrevious: max_previous,
                    tokens: required,
                }
                .abi_encode();
                self.broadcast(constants.oracle, U256::ZERO, data, "submitAnswerERC20")
                    .await
            }
            None => {
                let required = required_bond(snapshot.bond, constants.minimum_bond, 18);
                let data = IRealityOracle::submitAnswerCall {
                    questionId: snapshot.question_id,
                    answer: answer_bytes,
                    maxPrevious: max_previous,
                }
                .abi_encode();
                self.broadcast(constants.oracle, required, data, "submitAnswer")
                    .await
            }
        }
    }

    /// Execute the batch at `index`.
    ///
    /// Strict order: `index` must equal the next executable index, the
    /// question must be finalized approving, the cooldown elapsed, and the
    /// approval not expired.
    #[instrument(skip(self), fields(proposal = %self.proposal_id, index))]
    pub async fn execute_batch(&self, index: usize) -> Result<BroadcastOutcome, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;

        if !snapshot.finalized {
            return Err(ExecError::PreconditionNotMet(
                "question not finalized".into(),
            ));
        }
        if snapshot.approved != Some(true) {
            return Err(ExecError::PreconditionNotMet(
                "final answer does not approve execution".into(),
            ));
        }
        if snapshot.best_answer == ANSWER_INVALID {
            return Err(ExecError::PreconditionNotMet("question deemed invalid".into()));
        }
        match snapshot.next_executable_index {
            Some(next) if next == index => {}
            Some(next) => {
                return Err(ExecError::PreconditionNotMet(format!(
                    "batch {index} is out of order; next executable batch is {next}"
                )));
            }
            None => {
                return Err(ExecError::PreconditionNotMet(
                    "all batches already executed".into(),
                ));
            }
        }

        let now = Utc::now().timestamp().max(0) as u64;
        let unlock = snapshot.finalize_ts.saturating_add(constants.cooldown);
        if now < unlock {
            return Err(ExecError::PreconditionNotMet(format!(
                "cooldown active until unix {unlock}"
            )));
        }
        if constants.expiration > 0 {
            let stale_at = snapshot.finalize_ts.saturating_add(constants.expiration);
            if now > stale_at {
                return Err(ExecError::PreconditionNotMet(format!(
                    "approval expired at unix {stale_at}"
                )));
            }
        }

        let tx = &self.transactions[index];
        let data = IRealityModule::executeProposalWithIndexCall {
            proposalId: self.proposal_id.clone(),
            txHashes: self.tx_hashes.clone(),
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation.as_u8(),
            txIndex: U256::from(index),
        }
        .abi_encode();

        let outcome = self
            .broadcast(self.module, U256::ZERO, data, "executeProposalWithIndex")
            .await?;
        info!(tx = %outcome.tx_hash, index, "Batch executed");
        Ok(outcome)
    }

    /// Reconstruct the answer history from oracle logs, newest first.
    pub async fn dispute_history(&self) -> Result<Vec<DisputeHistoryEntry>, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;
        if snapshot.question_id == B256::ZERO {
            return Ok(Vec::new());
        }

        let latest = self.gateway.block_number().await?;
        let oracle = constants.oracle;
        let question_id = snapshot.question_id;

        let mut logs = self
            .fetcher
            .fetch_all(self.scan_start, latest, |from, to| {
                let gateway = Arc::clone(&self.gateway);
                async move {
                    gateway
                        .get_logs(&LogQuery {
                            address: oracle,
                            topics: vec![
                                Some(IRealityOracle::LogNewAnswer::SIGNATURE_HASH),
                                Some(question_id),
                            ],
                            from_block: from,
                            to_block: to,
                        })
                        .await
                }
            })
            .await?;

        // Log windows settle in arbitrary order; restore chain order first.
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        let mut entries = Vec::with_capacity(logs.len());
        for log in &logs {
            let event = IRealityOracle::LogNewAnswer::decode_raw_log(
                log.topics.iter().copied(),
                &log.data,
                true,
            )
            .map_err(|e| ExecError::decode("LogNewAnswer", e))?;

            // Commitment answers reveal later; their bond still chains.
            entries.push(DisputeHistoryEntry {
                user: event.user,
                history_hash: event.historyHash,
                bond: event.bond,
                answer: event.answer,
            });
        }

        entries.reverse();
        Ok(entries)
    }

    /// Replay the history chain to the oracle's claim entry point and
    /// withdraw the resulting balance.
    #[instrument(skip(self), fields(proposal = %self.proposal_id))]
    pub async fn claim_bonds(&self) -> Result<BroadcastOutcome, ExecError> {
        let constants = self.constants().await?;
        let snapshot = self.read_state().await?;

        if !snapshot.finalized {
            return Err(ExecError::PreconditionNotMet(
                "bonds claimable only after finalization".into(),
            ));
        }

        let entries = self.dispute_history().await?;
        if entries.is_empty() {
            return Err(ExecError::PreconditionNotMet("no answers to claim".into()));
        }

        let (history_hashes, users, bonds, answers) = claim_arguments(&entries);
        let data = IRealityOracle::claimMultipleAndWithdrawBalanceCall {
            questionIds: vec![snapshot.question_id],
            lengths: vec![U256::from(entries.len())],
            historyHashes: history_hashes,
            addrs: users,
            bonds,
            answers,
        }
        .abi_encode();

        self.broadcast(
            constants.oracle,
            U256::ZERO,
            data,
            "claimMultipleAndWithdrawBalance",
        )
        .await
    }

    /// Withdraw any claimable balance left on the oracle.
    pub async fn withdraw(&self) -> Result<BroadcastOutcome, ExecError> {
        let constants = self.constants().await?;
        let data = IRealityOracle::withdrawCall {}.abi_encode();
        self.broadcast(constants.oracle, U256::ZERO, data, "withdraw")
            .await
    }

    fn account(&self) -> Result<Address, ExecError> {
        self.gateway.account().ok_or_else(|| {
            ExecError::PreconditionNotMet("no posting account configured".into())
        })
    }

    /// `(decimals, allowance, balance)` of the bond token for `account`.
    async fn erc20_position(
        &self,
        token: Address,
        spender: Address,
        account: Address,
    ) -> Result<(u8, U256, U256), ExecError> {
        use super::abi::IERC20;

        let calls = vec![
            (token, Bytes::from(IERC20::decimalsCall {}.abi_encode())),
            (
                token,
                Bytes::from(
                    IERC20::allowanceCall {
                        owner: account,
                        spender,
                    }
                    .abi_encode(),
                ),
            ),
            (
                token,
                Bytes::from(IERC20::balanceOfCall { owner: account }.abi_encode()),
            ),
        ];
        let outcomes = self.gateway.multicall(&calls).await?;
        if outcomes.len() != calls.len() {
            return Err(ExecError::decode("erc20 position", "short multicall response"));
        }

        let decimals =
            decode_return::<IERC20::decimalsCall>(expect_success(&outcomes[0], "decimals()")?, "decimals()")?._0;
        let allowance =
            decode_return::<IERC20::allowanceCall>(expect_success(&outcomes[1], "allowance()")?, "allowance()")?._0;
        let balance =
            decode_return::<IERC20::balanceOfCall>(expect_success(&outcomes[2], "balanceOf()")?, "balanceOf()")?._0;

        self.session.store_allowance(token, spender, allowance);
        Ok((decimals, allowance, balance))
    }

    async fn broadcast(
        &self,
        to: Address,
        value: U256,
        data: Vec<u8>,
        what: &str,
    ) -> Result<BroadcastOutcome, ExecError> {
        let outcome = self
            .gateway
            .send_transaction(&TxRequest {
                to,
                value,
                data: Bytes::from(data),
            })
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

/// Assemble bond-claim arrays from history entries (newest first).
///
/// The claim replays oldest first. Each slot carries the chain head
/// *before* that answer landed: the genesis slot is the zero hash (the
/// newest entry's own head is discarded), matching the oracle's
/// bookkeeping rule.
pub fn claim_arguments(
    entries_newest_first: &[DisputeHistoryEntry],
) -> (Vec<B256>, Vec<Address>, Vec<U256>, Vec<B256>) {
    let oldest_first: Vec<&DisputeHistoryEntry> = entries_newest_first.iter().rev().collect();

    let mut history_hashes = Vec::with_capacity(oldest_first.len());
    let mut users = Vec::with_capacity(oldest_first.len());
    let mut bonds = Vec::with_capacity(oldest_first.len());
    let mut answers = Vec::with_capacity(oldest_first.len());

    for (i, entry) in oldest_first.iter().enumerate() {
        let previous = if i == 0 {
            B256::ZERO
        } else {
            oldest_first[i - 1].history_hash
        };
        history_hashes.push(previous);
        users.push(entry.user);
        bonds.push(entry.bond);
        answers.push(entry.answer);
    }

    (history_hashes, users, bonds, answers)
}

#[async_trait]
impl ExecutionAdapter for ReasonedOracleAdapter {
    async fn propose(&self) -> Result<Option<BroadcastOutcome>, ExecError> {
        Self::propose(self).await
    }

    async fn dispute(&self) -> Result<BroadcastOutcome, ExecError> {
        // Challenging means out-bonding the standing answer with its
        // opposite.
        let snapshot = self.read_state().await?;
        if snapshot.history_hash == B256::ZERO {
            return Err(ExecError::PreconditionNotMet(
                "nothing to dispute: no answer posted".into(),
            ));
        }
        let opposing = snapshot.best_answer != ANSWER_YES;
        self.submit_answer(opposing).await
    }

    async fn execute(&self, step: usize) -> Result<BroadcastOutcome, ExecError> {
        self.execute_batch(step).await
    }

    async fn refresh(&self) -> Result<Proposal, ExecError> {
        let snapshot = self.read_state().await?;
        Ok(Proposal {
            proposal_id: self.proposal_id.clone(),
            batch_hashes: self.tx_hashes.clone(),
            oracle_reference: (snapshot.question_id != B256::ZERO)
                .then_some(OracleReference::Question(snapshot.question_id)),
            submitted_at: None,
            phase: ProposalPhase::Reasoned(snapshot.phase),
        })
    }

    async fn next_step(&self) -> Result<Option<usize>, ExecError> {
        let snapshot = self.read_state().await?;
        if snapshot.finalized && snapshot.approved == Some(true) {
            Ok(snapshot.next_executable_index)
        } else {
            Ok(None)
        }
    }

    fn step_count(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seed: u8) -> DisputeHistoryEntry {
        DisputeHistoryEntry {
            user: Address::repeat_byte(seed),
            history_hash: B256::repeat_byte(seed),
            bond: U256::from(seed as u64),
            answer: if seed % 2 == 0 { ANSWER_YES } else { B256::ZERO },
        }
    }

    #[test]
    fn test_claim_arguments_zero_hash_genesis() {
        // Logs observed newest-first: 3 answered last, 1 first.
        let newest_first = vec![entry(3), entry(2), entry(1)];
        let (hashes, users, bonds, answers) = claim_arguments(&newest_first);

        // Replay runs oldest-first.
        assert_eq!(users, vec![entry(1).user, entry(2).user, entry(3).user]);
        assert_eq!(bonds[0], U256::from(1u64));
        assert_eq!(answers.len(), 3);

        // Genesis link is the zero hash; each later slot links backwards.
        assert_eq!(hashes[0], B256::ZERO);
        assert_eq!(hashes[1], entry(1).history_hash);
        assert_eq!(hashes[2], entry(2).history_hash);
        // The newest entry's own head never appears.
        assert!(!hashes.contains(&entry(3).history_hash));
    }

    #[test]
    fn test_claim_arguments_single_entry() {
        let (hashes, users, _, _) = claim_arguments(&[entry(7)]);
        assert_eq!(hashes, vec![B256::ZERO]);
        assert_eq!(users, vec![entry(7).user]);
    }

    #[test]
    fn test_question_separator_is_unit_separator() {
        assert_eq!(QUESTION_SEPARATOR as u32, 0x241f);
    }
}
