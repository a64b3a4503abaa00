//! Execution Module Port - Shared Oracle-Adapter Verbs
//!
//! Both oracle back-ends answer to the same three verbs: propose a batch
//! for authorization, dispute a pending authorization, and execute an
//! approved step. Everything back-end specific (answer submission, bond
//! claims, settlement) stays on the concrete adapter types.

use async_trait::async_trait;

use crate::domain::error::ExecError;
use crate::domain::proposal::Proposal;

use super::gateway::BroadcastOutcome;

/// The verbs shared by every execution module back-end.
///
/// An adapter instance is one proposal's state machine; the verbs take no
/// proposal arguments because the content was fixed at construction.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    /// Submit the proposal to the oracle.
    ///
    /// Returns `None` when the identical proposal already exists on-chain —
    /// resubmission is a no-op observed through the same oracle reference.
    async fn propose(&self) -> Result<Option<BroadcastOutcome>, ExecError>;

    /// Challenge the pending authorization.
    async fn dispute(&self) -> Result<BroadcastOutcome, ExecError>;

    /// Execute one approved step.
    ///
    /// The market-oracle module executes one batch per call in strict
    /// nonce order; the assertion module has a single step covering the
    /// whole set. Fails with `PreconditionNotMet` when `step` is out of
    /// order or the oracle outcome is not final.
    async fn execute(&self, step: usize) -> Result<BroadcastOutcome, ExecError>;

    /// Re-read the proposal's on-chain state.
    ///
    /// Must be called again after any write confirms; a refresh that raced
    /// a write may have observed stale data.
    async fn refresh(&self) -> Result<Proposal, ExecError>;

    /// Next step `execute` would accept right now, if any.
    ///
    /// `None` while the oracle outcome is pending, the proposal was
    /// rejected, or every step already executed. Time-based gates
    /// (cooldown) may still fail a prompt `execute` call.
    async fn next_step(&self) -> Result<Option<usize>, ExecError>;

    /// Number of execution steps this proposal has.
    fn step_count(&self) -> usize;
}
