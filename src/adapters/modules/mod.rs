//! Execution Module Adapters
//!
//! The two interchangeable oracle back-ends behind the shared
//! propose/dispute/execute verbs:
//!
//! - `reality` - binary-question market oracle (bonded answer escalation,
//!   per-batch nonce-ordered execution)
//! - `optimistic` - optimistic assertion oracle (flat bond, liveness
//!   window, atomic execution)
//!
//! `abi` holds the `sol!` bindings both adapters encode against.

pub mod abi;
pub mod optimistic;
pub mod reality;

use alloy::sol_types::SolCall;
use async_trait::async_trait;

use crate::domain::error::ExecError;
use crate::domain::proposal::Proposal;
use crate::ports::gateway::{BroadcastOutcome, CallOutcome};
use crate::ports::module::ExecutionAdapter;

pub use optimistic::{AssertionOracleAdapter, AssertionSnapshot};
pub use reality::{RealitySnapshot, ReasonedOracleAdapter};

/// A proposal's adapter, tagged by oracle back-end.
///
/// The shared verbs dispatch through here; back-end specific operations
/// (answer submission, bond claims, settlement) are reached by matching
/// on the variant.
pub enum ExecutionModule {
    /// Binary-question market oracle.
    Reasoned(ReasonedOracleAdapter),
    /// Optimistic assertion oracle.
    Assertion(AssertionOracleAdapter),
}

#[async_trait]
impl ExecutionAdapter for ExecutionModule {
    async fn propose(&self) -> Result<Option<BroadcastOutcome>, ExecError> {
        match self {
            Self::Reasoned(adapter) => ExecutionAdapter::propose(adapter).await,
            Self::Assertion(adapter) => ExecutionAdapter::propose(adapter).await,
        }
    }

    async fn dispute(&self) -> Result<BroadcastOutcome, ExecError> {
        match self {
            Self::Reasoned(adapter) => adapter.dispute().await,
            Self::Assertion(adapter) => adapter.dispute().await,
        }
    }

    async fn execute(&self, step: usize) -> Result<BroadcastOutcome, ExecError> {
        match self {
            Self::Reasoned(adapter) => adapter.execute(step).await,
            Self::Assertion(adapter) => adapter.execute(step).await,
        }
    }

    async fn refresh(&self) -> Result<Proposal, ExecError> {
        match self {
            Self::Reasoned(adapter) => adapter.refresh().await,
            Self::Assertion(adapter) => adapter.refresh().await,
        }
    }

    async fn next_step(&self) -> Result<Option<usize>, ExecError> {
        match self {
            Self::Reasoned(adapter) => adapter.next_step().await,
            Self::Assertion(adapter) => adapter.next_step().await,
        }
    }

    fn step_count(&self) -> usize {
        match self {
            Self::Reasoned(adapter) => adapter.step_count(),
            Self::Assertion(adapter) => adapter.step_count(),
        }
    }
}

/// Reject a failed call inside an aggregate where success was required.
pub(crate) fn expect_success<'a>(
    outcome: &'a CallOutcome,
    what: &str,
) -> Result<&'a [u8], ExecError> {
    if outcome.success {
        Ok(&outcome.data)
    } else {
        Err(ExecError::decode(what, "call reverted"))
    }
}

/// Decode a call's return data, naming the call on failure.
pub(crate) fn decode_return<C: SolCall>(data: &[u8], what: &str) -> Result<C::Return, ExecError> {
    C::abi_decode_returns(data, true).map_err(|e| ExecError::decode(what, e))
}
