//! Integration Tests - End-to-end Oracle Adapter Scenarios
//!
//! Drives both oracle adapters against scripted in-memory gateways that
//! answer ABI-encoded reads and mutate state on broadcasts, plus mockall
//! mocks for keeper orchestration. No network anywhere.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use chrono::Utc;

use govexec::adapters::events::RangeFetcher;
use govexec::adapters::modules::abi::{
    Assertion, EscalationManagerSettings, IAssertionOracle, IERC20, IOptimisticGovernor,
    IRealityModule, IRealityOracle,
};
use govexec::adapters::modules::{AssertionOracleAdapter, ReasonedOracleAdapter};
use govexec::domain::batch::SafeVersion;
use govexec::domain::error::ExecError;
use govexec::domain::proposal::{AssertionPhase, ReasonedPhase};
use govexec::domain::transaction::{ExecutionBatch, ModuleTransaction, Operation};
use govexec::ports::gateway::{
    BroadcastOutcome, CallOutcome, EvmGateway, LogEntry, LogQuery, TxRequest,
};
use govexec::ports::module::ExecutionAdapter;
use govexec::usecases::session::SessionCache;

const MODULE: Address = Address::repeat_byte(0x10);
const ORACLE: Address = Address::repeat_byte(0x20);
const COLLATERAL: Address = Address::repeat_byte(0x30);
const ACCOUNT: Address = Address::repeat_byte(0xaa);
const QUESTION_ID: B256 = B256::repeat_byte(0x42);
const ASSERTION_ID: B256 = B256::repeat_byte(0x43);
const ANSWER_YES: B256 = B256::with_last_byte(1);

fn word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

fn word_b256(value: B256) -> Bytes {
    Bytes::from(value.to_vec())
}

fn word_bool(value: bool) -> Bytes {
    word(U256::from(u8::from(value)))
}

fn word_address(value: Address) -> Bytes {
    let mut padded = [0u8; 32];
    padded[12..].copy_from_slice(value.as_slice());
    Bytes::from(padded.to_vec())
}

fn ok(data: Bytes) -> CallOutcome {
    CallOutcome {
        success: true,
        data,
    }
}

fn reverted() -> CallOutcome {
    CallOutcome {
        success: false,
        data: Bytes::new(),
    }
}

fn sample_tx(seed: u8) -> ModuleTransaction {
    ModuleTransaction {
        to: Address::repeat_byte(seed),
        value: U256::from(seed as u64),
        data: Bytes::from(vec![seed]),
        operation: Operation::Call,
    }
}

fn confirmed(success: bool) -> BroadcastOutcome {
    BroadcastOutcome {
        tx_hash: B256::repeat_byte(0x99),
        block_number: 5,
        success,
        revert_reason: (!success).then(|| "execution reverted".to_string()),
    }
}

// ---- Scripted Reality module + oracle ----

/// In-memory stand-in for a Reality-style module and its oracle.
struct FakeRealityLedger {
    minimum_bond: U256,
    proposed: AtomicBool,
    tx_hashes: Mutex<Vec<B256>>,
    executed: Mutex<Vec<bool>>,
    finalized: AtomicBool,
    best_answer: Mutex<B256>,
    bond: Mutex<U256>,
    history_hash: Mutex<B256>,
    answer_logs: Mutex<Vec<LogEntry>>,
}

impl FakeRealityLedger {
    fn new(batches: usize, minimum_bond: u64) -> Self {
        Self {
            minimum_bond: U256::from(minimum_bond),
            proposed: AtomicBool::new(false),
            tx_hashes: Mutex::new(Vec::new()),
            executed: Mutex::new(vec![false; batches]),
            finalized: AtomicBool::new(false),
            best_answer: Mutex::new(B256::ZERO),
            bond: Mutex::new(U256::ZERO),
            history_hash: Mutex::new(B256::ZERO),
            answer_logs: Mutex::new(Vec::new()),
        }
    }

    fn set_tx_hashes(&self, hashes: Vec<B256>) {
        *self.tx_hashes.lock().unwrap() = hashes;
    }

    /// Simulate the oracle finalizing on an approving answer.
    fn finalize_yes(&self) {
        *self.best_answer.lock().unwrap() = ANSWER_YES;
        *self.history_hash.lock().unwrap() = B256::repeat_byte(0x77);
        self.finalized.store(true, Ordering::SeqCst);
    }

    fn record_answer_log(&self, user: Address, bond: U256, answer: B256, block: u64) {
        let history_hash = B256::repeat_byte(block as u8);
        let event = IRealityOracle::LogNewAnswer {
            answer,
            questionId: QUESTION_ID,
            historyHash: history_hash,
            user,
            bond,
            ts: U256::from(block),
            isCommitment: false,
        };
        let log_data = event.encode_log_data();
        self.answer_logs.lock().unwrap().push(LogEntry {
            address: ORACLE,
            topics: log_data.topics().to_vec(),
            data: log_data.data.clone(),
            block_number: block,
            transaction_hash: B256::repeat_byte(block as u8),
            log_index: 0,
        });
        *self.history_hash.lock().unwrap() = history_hash;
    }

    fn answer_call(&self, data: &[u8]) -> CallOutcome {
        let selector: [u8; 4] = data[..4].try_into().unwrap();
        match selector {
            s if s == IRealityModule::questionIdsCall::SELECTOR => {
                if self.proposed.load(Ordering::SeqCst) {
                    ok(word_b256(QUESTION_ID))
                } else {
                    ok(word_b256(B256::ZERO))
                }
            }
            s if s == IRealityModule::executedProposalTransactionsCall::SELECTOR => {
                let call =
                    IRealityModule::executedProposalTransactionsCall::abi_decode(data, true)
                        .unwrap();
                let hashes = self.tx_hashes.lock().unwrap();
                let index = hashes.iter().position(|h| *h == call.txHash).unwrap();
                ok(word_bool(self.executed.lock().unwrap()[index]))
            }
            s if s == IRealityModule::oracleCall::SELECTOR => ok(word_address(ORACLE)),
            s if s == IRealityModule::avatarCall::SELECTOR => {
                ok(word_address(Address::repeat_byte(0x11)))
            }
            s if s == IRealityModule::questionCooldownCall::SELECTOR => ok(word(U256::ZERO)),
            s if s == IRealityModule::answerExpirationCall::SELECTOR => ok(word(U256::ZERO)),
            s if s == IRealityModule::minimumBondCall::SELECTOR => ok(word(self.minimum_bond)),
            // Native-asset oracle: the capability probe must observe failure.
            s if s == IRealityOracle::tokenCall::SELECTOR => reverted(),
            s if s == IRealityOracle::resultForCall::SELECTOR => {
                if self.finalized.load(Ordering::SeqCst) {
                    ok(word_b256(*self.best_answer.lock().unwrap()))
                } else {
                    reverted()
                }
            }
            s if s == IRealityOracle::getFinalizeTSCall::SELECTOR => ok(word(U256::from(1u64))),
            s if s == IRealityOracle::getBondCall::SELECTOR => {
                ok(word(*self.bond.lock().unwrap()))
            }
            s if s == IRealityOracle::isFinalizedCall::SELECTOR => {
                ok(word_bool(self.finalized.load(Ordering::SeqCst)))
            }
            s if s == IRealityOracle::getBestAnswerCall::SELECTOR => {
                ok(word_b256(*self.best_answer.lock().unwrap()))
            }
            s if s == IRealityOracle::getHistoryHashCall::SELECTOR => {
                ok(word_b256(*self.history_hash.lock().unwrap()))
            }
            _ => reverted(),
        }
    }
}

#[async_trait]
impl EvmGateway for FakeRealityLedger {
    async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(100)
    }

    async fn block_number(&self) -> anyhow::Result<u64> {
        Ok(10)
    }

    fn account(&self) -> Option<Address> {
        Some(ACCOUNT)
    }

    async fn call(&self, _to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        let outcome = self.answer_call(&data);
        anyhow::ensure!(outcome.success, "call reverted");
        Ok(outcome.data)
    }

    async fn multicall(&self, calls: &[(Address, Bytes)]) -> anyhow::Result<Vec<CallOutcome>> {
        Ok(calls.iter().map(|(_, data)| self.answer_call(data)).collect())
    }

    async fn get_logs(&self, query: &LogQuery) -> anyhow::Result<Vec<LogEntry>> {
        Ok(self
            .answer_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.block_number >= query.from_block && log.block_number <= query.to_block)
            .cloned()
            .collect())
    }

    async fn send_transaction(&self, tx: &TxRequest) -> anyhow::Result<BroadcastOutcome> {
        let selector: [u8; 4] = tx.data[..4].try_into().unwrap();
        match selector {
            s if s == IRealityModule::addProposalCall::SELECTOR => {
                self.proposed.store(true, Ordering::SeqCst);
            }
            s if s == IRealityModule::executeProposalWithIndexCall::SELECTOR => {
                let call =
                    IRealityModule::executeProposalWithIndexCall::abi_decode(&tx.data, true)
                        .unwrap();
                let index = call.txIndex.to::<usize>();
                self.executed.lock().unwrap()[index] = true;
            }
            s if s == IRealityOracle::submitAnswerCall::SELECTOR => {
                let call = IRealityOracle::submitAnswerCall::abi_decode(&tx.data, true).unwrap();
                *self.best_answer.lock().unwrap() = call.answer;
                *self.bond.lock().unwrap() = tx.value;
                let block = self.answer_logs.lock().unwrap().len() as u64 + 1;
                self.record_answer_log(ACCOUNT, tx.value, call.answer, block);
            }
            _ => {}
        }
        Ok(confirmed(true))
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

fn reality_adapter(ledger: &Arc<FakeRealityLedger>, batches: usize) -> ReasonedOracleAdapter {
    let gateway: Arc<dyn EvmGateway> = Arc::clone(ledger) as Arc<dyn EvmGateway>;
    let batches: Vec<ExecutionBatch> = (0..batches)
        .map(|i| ExecutionBatch::new(i as u64, vec![sample_tx(i as u8 + 1)]))
        .collect();

    let adapter = ReasonedOracleAdapter::new(
        gateway,
        Arc::new(SessionCache::new()),
        100,
        MODULE,
        SafeVersion::V1_3_0,
        "QmProposalScenarioA".to_string(),
        &batches,
        RangeFetcher::default(),
        0,
    )
    .unwrap();

    ledger.set_tx_hashes(adapter.batch_hashes().to_vec());
    adapter
}

// ---- Scenario A: Reality adapter, ordered batch execution ----

#[tokio::test]
async fn test_scenario_a_ordered_execution() {
    let ledger = Arc::new(FakeRealityLedger::new(3, 100));
    let adapter = reality_adapter(&ledger, 3);

    // Propose, then observe idempotency on resubmission.
    assert!(adapter.propose().await.unwrap().is_some());
    assert!(adapter.propose().await.unwrap().is_none());

    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.phase, ReasonedPhase::Proposed);
    assert_eq!(snapshot.next_executable_index, Some(0));

    // Execution is locked until the oracle approves.
    let err = adapter.execute_batch(0).await.unwrap_err();
    assert!(matches!(err, ExecError::PreconditionNotMet(_)));

    // Oracle finalizes on "approved".
    ledger.finalize_yes();
    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.phase, ReasonedPhase::Finalized);
    assert_eq!(snapshot.approved, Some(true));

    // Out-of-order execution is rejected client-side.
    let err = adapter.execute_batch(1).await.unwrap_err();
    assert!(matches!(err, ExecError::PreconditionNotMet(_)));

    // In order: 0, 1, 2 — next index advances by exactly one each time.
    adapter.execute_batch(0).await.unwrap();
    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.next_executable_index, Some(1));
    assert_eq!(snapshot.phase, ReasonedPhase::PartiallyExecuted(1));

    adapter.execute_batch(1).await.unwrap();
    adapter.execute_batch(2).await.unwrap();

    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.next_executable_index, None);
    assert_eq!(snapshot.phase, ReasonedPhase::FullyExecuted);

    // Nothing left to execute.
    let err = adapter.execute_batch(0).await.unwrap_err();
    assert!(matches!(err, ExecError::PreconditionNotMet(_)));
}

#[tokio::test]
async fn test_reality_answer_escalation_and_dispute_phase() {
    let ledger = Arc::new(FakeRealityLedger::new(1, 100));
    let adapter = reality_adapter(&ledger, 1);
    adapter.propose().await.unwrap();

    // First answer posts the opening bond (native path: value-carried).
    adapter.submit_answer(true).await.unwrap();
    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.bond, U256::from(100u64));
    assert_eq!(snapshot.phase, ReasonedPhase::AnswerPending);

    // A counter-answer must double the bond; the standing bond now
    // exceeds the opening requirement, which reads as a dispute.
    adapter.submit_answer(false).await.unwrap();
    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.bond, U256::from(200u64));
    assert_eq!(snapshot.phase, ReasonedPhase::Disputed);

    // History reconstruction: newest first.
    let history = adapter.dispute_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].bond, U256::from(200u64));
    assert_eq!(history[1].bond, U256::from(100u64));
}

// ---- Scripted optimistic governor + assertion oracle ----

struct FakeGovernorLedger {
    bond: U256,
    liveness: u64,
    /// allowance per spender.
    allowances: Mutex<HashMap<Address, U256>>,
    balance: Mutex<U256>,
    proposed_at: Mutex<Option<u64>>,
    disputer: Mutex<Address>,
    settled: AtomicBool,
    resolution: AtomicBool,
    executed: AtomicBool,
}

impl FakeGovernorLedger {
    fn new(bond: u64, balance: u64) -> Self {
        Self {
            bond: U256::from(bond),
            liveness: 3600,
            allowances: Mutex::new(HashMap::new()),
            balance: Mutex::new(U256::from(balance)),
            proposed_at: Mutex::new(None),
            disputer: Mutex::new(Address::ZERO),
            settled: AtomicBool::new(false),
            resolution: AtomicBool::new(false),
            executed: AtomicBool::new(false),
        }
    }

    fn settle(&self, resolution: bool) {
        self.settled.store(true, Ordering::SeqCst);
        self.resolution.store(resolution, Ordering::SeqCst);
    }

    fn assertion(&self) -> Assertion {
        let proposed_at = self.proposed_at.lock().unwrap().unwrap_or_default();
        Assertion {
            escalationManagerSettings: EscalationManagerSettings {
                arbitrateViaEscalationManager: false,
                discardOracle: false,
                validateDisputers: false,
                assertingCaller: MODULE,
                escalationManager: Address::ZERO,
            },
            asserter: ACCOUNT,
            assertionTime: proposed_at,
            settled: self.settled.load(Ordering::SeqCst),
            currency: COLLATERAL,
            expirationTime: proposed_at + self.liveness,
            settlementResolution: self.resolution.load(Ordering::SeqCst),
            domainId: B256::ZERO,
            identifier: B256::ZERO,
            bond: self.bond,
            callbackRecipient: Address::ZERO,
            disputer: *self.disputer.lock().unwrap(),
        }
    }

    fn answer_call(&self, data: &[u8]) -> CallOutcome {
        let selector: [u8; 4] = data[..4].try_into().unwrap();
        match selector {
            s if s == IOptimisticGovernor::optimisticOracleV3Call::SELECTOR => {
                ok(word_address(ORACLE))
            }
            s if s == IOptimisticGovernor::bondAmountCall::SELECTOR => ok(word(self.bond)),
            s if s == IOptimisticGovernor::livenessCall::SELECTOR => {
                ok(word(U256::from(self.liveness)))
            }
            s if s == IOptimisticGovernor::collateralCall::SELECTOR => {
                ok(word_address(COLLATERAL))
            }
            s if s == IOptimisticGovernor::avatarCall::SELECTOR => {
                ok(word_address(Address::repeat_byte(0x11)))
            }
            s if s == IOptimisticGovernor::rulesCall::SELECTOR => {
                ok(Bytes::from("proposals must pass a vote".to_string().abi_encode()))
            }
            s if s == IOptimisticGovernor::proposalHashesCall::SELECTOR => {
                let at = self.proposed_at.lock().unwrap().unwrap_or_default();
                ok(word(U256::from(at)))
            }
            s if s == IOptimisticGovernor::assertionIdsCall::SELECTOR => {
                if self.proposed_at.lock().unwrap().is_some() {
                    ok(word_b256(ASSERTION_ID))
                } else {
                    ok(word_b256(B256::ZERO))
                }
            }
            s if s == IERC20::symbolCall::SELECTOR => ok(Bytes::from("WETH".to_string().abi_encode())),
            s if s == IERC20::decimalsCall::SELECTOR => ok(word(U256::from(18u64))),
            s if s == IERC20::allowanceCall::SELECTOR => {
                let call = IERC20::allowanceCall::abi_decode(data, true).unwrap();
                let allowances = self.allowances.lock().unwrap();
                ok(word(allowances.get(&call.spender).copied().unwrap_or_default()))
            }
            s if s == IERC20::balanceOfCall::SELECTOR => ok(word(*self.balance.lock().unwrap())),
            s if s == IAssertionOracle::getAssertionCall::SELECTOR => {
                if self.proposed_at.lock().unwrap().is_some() {
                    ok(Bytes::from(self.assertion().abi_encode()))
                } else {
                    reverted()
                }
            }
            _ => reverted(),
        }
    }
}

#[async_trait]
impl EvmGateway for FakeGovernorLedger {
    async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(100)
    }

    async fn block_number(&self) -> anyhow::Result<u64> {
        Ok(10)
    }

    fn account(&self) -> Option<Address> {
        Some(ACCOUNT)
    }

    async fn call(&self, _to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        let outcome = self.answer_call(&data);
        anyhow::ensure!(outcome.success, "call reverted");
        Ok(outcome.data)
    }

    async fn multicall(&self, calls: &[(Address, Bytes)]) -> anyhow::Result<Vec<CallOutcome>> {
        Ok(calls.iter().map(|(_, data)| self.answer_call(data)).collect())
    }

    async fn get_logs(&self, _query: &LogQuery) -> anyhow::Result<Vec<LogEntry>> {
        Ok(Vec::new())
    }

    async fn send_transaction(&self, tx: &TxRequest) -> anyhow::Result<BroadcastOutcome> {
        let selector: [u8; 4] = tx.data[..4].try_into().unwrap();
        match selector {
            s if s == IERC20::approveCall::SELECTOR => {
                let call = IERC20::approveCall::abi_decode(&tx.data, true).unwrap();
                self.allowances
                    .lock()
                    .unwrap()
                    .insert(call.spender, call.amount);
            }
            s if s == IOptimisticGovernor::proposeTransactionsCall::SELECTOR => {
                *self.proposed_at.lock().unwrap() = Some(Utc::now().timestamp().max(0) as u64);
            }
            s if s == IAssertionOracle::disputeAssertionCall::SELECTOR => {
                let call = IAssertionOracle::disputeAssertionCall::abi_decode(&tx.data, true)
                    .unwrap();
                *self.disputer.lock().unwrap() = call.disputer;
            }
            s if s == IOptimisticGovernor::executeProposalCall::SELECTOR => {
                self.executed.store(true, Ordering::SeqCst);
            }
            _ => {}
        }
        Ok(confirmed(true))
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

fn governor_adapter(ledger: &Arc<FakeGovernorLedger>) -> AssertionOracleAdapter {
    let gateway: Arc<dyn EvmGateway> = Arc::clone(ledger) as Arc<dyn EvmGateway>;
    AssertionOracleAdapter::new(
        gateway,
        Arc::new(SessionCache::new()),
        MODULE,
        "QmProposalScenarioB".to_string(),
        vec![sample_tx(1), sample_tx(2)],
        "treasury diversification tranche 1".to_string(),
        RangeFetcher::default(),
        0,
    )
}

// ---- Scenario B: assertion adapter, bond gating + dispute ----

#[tokio::test]
async fn test_scenario_b_bond_gating_dispute_and_execution() {
    let ledger = Arc::new(FakeGovernorLedger::new(1_000, 50_000));
    let adapter = governor_adapter(&ledger);

    // Bond shortfall is caught before anything is broadcast.
    let err = adapter.propose().await.unwrap_err();
    assert!(matches!(err, ExecError::InsufficientAllowance { .. }));

    // Approve the module for the bond, then propose succeeds.
    let approval = adapter.approval_for_bond().await.unwrap().unwrap();
    ledger
        .send_transaction(&TxRequest {
            to: approval.to,
            value: approval.value,
            data: approval.data.clone(),
        })
        .await
        .unwrap();
    assert!(adapter.propose().await.unwrap().is_some());
    // Resubmission of the identical set is a no-op.
    assert!(adapter.propose().await.unwrap().is_none());

    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.phase, AssertionPhase::Proposed);

    // Execution before resolution is a precondition failure.
    let err = adapter.execute_all().await.unwrap_err();
    assert!(matches!(err, ExecError::PreconditionNotMet(_)));

    // Disputing also posts a bond — toward the oracle this time.
    let err = adapter.dispute_assertion().await.unwrap_err();
    assert!(matches!(err, ExecError::InsufficientAllowance { .. }));

    let approval = govexec::domain::bond::build_approval(COLLATERAL, ORACLE, U256::from(1_000u64));
    ledger
        .send_transaction(&TxRequest {
            to: approval.to,
            value: approval.value,
            data: approval.data.clone(),
        })
        .await
        .unwrap();
    adapter.dispute_assertion().await.unwrap();

    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.phase, AssertionPhase::Disputed);

    // Still not executable while the dispute is unresolved.
    let err = adapter.execute_all().await.unwrap_err();
    assert!(matches!(err, ExecError::PreconditionNotMet(_)));

    // External oracle resolves the dispute in favor of the proposal.
    ledger.settle(true);
    let snapshot = adapter.read_state().await.unwrap();
    assert_eq!(snapshot.phase, AssertionPhase::Settled);
    assert_eq!(snapshot.resolution, Some(true));

    adapter.execute_all().await.unwrap();
    assert!(ledger.executed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_assertion_insufficient_balance() {
    // Allowance fine, balance short.
    let ledger = Arc::new(FakeGovernorLedger::new(1_000, 10));
    ledger
        .allowances
        .lock()
        .unwrap()
        .insert(MODULE, U256::from(5_000u64));
    let adapter = governor_adapter(&ledger);

    let err = adapter.propose().await.unwrap_err();
    assert!(matches!(err, ExecError::InsufficientBond { .. }));
}

// ---- Keeper orchestration over a mocked adapter ----

mockall::mock! {
    pub Adapter {}

    #[async_trait]
    impl ExecutionAdapter for Adapter {
        async fn propose(&self) -> Result<Option<BroadcastOutcome>, ExecError>;
        async fn dispute(&self) -> Result<BroadcastOutcome, ExecError>;
        async fn execute(&self, step: usize) -> Result<BroadcastOutcome, ExecError>;
        async fn refresh(&self) -> Result<govexec::domain::proposal::Proposal, ExecError>;
        async fn next_step(&self) -> Result<Option<usize>, ExecError>;
        fn step_count(&self) -> usize;
    }
}

fn mock_proposal(phase: ReasonedPhase) -> govexec::domain::proposal::Proposal {
    govexec::domain::proposal::Proposal {
        proposal_id: "QmKeeper".to_string(),
        batch_hashes: vec![B256::repeat_byte(1)],
        oracle_reference: None,
        submitted_at: None,
        phase: govexec::domain::proposal::ProposalPhase::Reasoned(phase),
    }
}

#[tokio::test]
async fn test_keeper_executes_ready_step_and_rereads() {
    use govexec::usecases::keeper::{Keeper, TrackedProposal};

    let mut adapter = MockAdapter::new();
    // Initial refresh, then the post-write re-read.
    adapter
        .expect_refresh()
        .times(2)
        .returning(|| Ok(mock_proposal(ReasonedPhase::Finalized)));
    adapter.expect_next_step().times(1).returning(|| Ok(Some(0)));
    adapter
        .expect_execute()
        .with(mockall::predicate::eq(0usize))
        .times(1)
        .returning(|_| Ok(confirmed(true)));

    let mut keeper = Keeper::new(
        vec![TrackedProposal::new("mock/QmKeeper".into(), Box::new(adapter))],
        std::time::Duration::from_secs(3600),
        true,
        false,
    );
    keeper.sweep().await;
}

#[tokio::test]
async fn test_keeper_dry_run_never_executes() {
    use govexec::usecases::keeper::{Keeper, TrackedProposal};

    let mut adapter = MockAdapter::new();
    adapter
        .expect_refresh()
        .times(1)
        .returning(|| Ok(mock_proposal(ReasonedPhase::Finalized)));
    adapter.expect_next_step().times(1).returning(|| Ok(Some(0)));
    adapter.expect_execute().times(0);

    let mut keeper = Keeper::new(
        vec![TrackedProposal::new("mock/QmKeeper".into(), Box::new(adapter))],
        std::time::Duration::from_secs(3600),
        true,
        true,
    );
    keeper.sweep().await;
}
