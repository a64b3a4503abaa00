//! Proposal lifecycle model.
//!
//! A proposal is created by its submission broadcast, mutated only by
//! oracle-observed events and execution calls, and never deleted — it stays
//! queryable forever through its content hashes. Each proposal's state
//! machine is independent; there is no cross-proposal shared state.

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a question on the binary-answer market oracle.
///
/// Answers and disputes cycle between `AnswerPending` and `Disputed` with
/// strictly increasing bonds until the question finalizes; execution then
/// proceeds batch by batch in nonce order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonedPhase {
    /// Nothing proposed under this question yet.
    NoProposal,
    /// Proposed on-chain, no answer posted.
    Proposed,
    /// An answer stands, challenge window open.
    AnswerPending,
    /// A competing bonded answer arrived.
    Disputed,
    /// Question finalized; execution gated on the final answer.
    Finalized,
    /// Some batches executed, more remain (count executed so far).
    PartiallyExecuted(usize),
    /// Every batch executed.
    FullyExecuted,
}

impl std::fmt::Display for ReasonedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoProposal => write!(f, "no-proposal"),
            Self::Proposed => write!(f, "proposed"),
            Self::AnswerPending => write!(f, "answer-pending"),
            Self::Disputed => write!(f, "disputed"),
            Self::Finalized => write!(f, "finalized"),
            Self::PartiallyExecuted(n) => write!(f, "partially-executed({n})"),
            Self::FullyExecuted => write!(f, "fully-executed"),
        }
    }
}

/// Lifecycle of an assertion on the optimistic oracle.
///
/// The transaction set executes as one atomic unit once the assertion is
/// unchallenged past its liveness window or resolved true; there is no
/// partial execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssertionPhase {
    /// No live assertion for this content hash (includes deleted ones).
    Invalid,
    /// Assembled locally, bond approval pending or submission not sent.
    Requested,
    /// Asserted on-chain, liveness window open.
    Proposed,
    /// Liveness elapsed unchallenged; executable.
    Expired,
    /// Challenged; resolution now rests with the external voting oracle.
    Disputed,
    /// The external oracle resolved the dispute.
    Resolved,
    /// Assertion settled on-chain, outcome recorded.
    Settled,
    /// Transaction set executed.
    Executed,
}

impl std::fmt::Display for AssertionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Invalid => "invalid",
            Self::Requested => "requested",
            Self::Proposed => "proposed",
            Self::Expired => "expired",
            Self::Disputed => "disputed",
            Self::Resolved => "resolved",
            Self::Settled => "settled",
            Self::Executed => "executed",
        };
        write!(f, "{label}")
    }
}

/// Phase of a proposal under either oracle back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalPhase {
    Reasoned(ReasonedPhase),
    Assertion(AssertionPhase),
}

impl std::fmt::Display for ProposalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reasoned(p) => write!(f, "{p}"),
            Self::Assertion(p) => write!(f, "{p}"),
        }
    }
}

/// On-chain identifier the oracle assigned to this proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleReference {
    /// Question id on the market oracle.
    Question(B256),
    /// Assertion id on the optimistic oracle.
    Assertion(B256),
}

/// Module constants read once per session and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Oracle contract the module defers to.
    pub oracle: Address,
    /// Bond currency; `None` means the oracle takes native-asset bonds.
    pub bond_token: Option<Address>,
    /// Minimum bond for the first answer / the flat assertion bond.
    pub minimum_bond: U256,
    /// Seconds a proposed answer or assertion stays challengeable.
    pub challenge_window_secs: u64,
}

/// A tracked proposal and where it stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Off-chain vote id this proposal executes.
    pub proposal_id: String,
    /// Content hashes of the batches, in nonce order.
    pub batch_hashes: Vec<B256>,
    /// Oracle-side identifier, once submitted.
    pub oracle_reference: Option<OracleReference>,
    /// Submission time as observed on-chain.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Current phase.
    pub phase: ProposalPhase,
}

/// One link of the market oracle's answer history.
///
/// The oracle stores only the head of a backward-linked hash chain; the
/// full chain is reconstructed from answer logs for bond claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeHistoryEntry {
    /// Account that posted the answer.
    pub user: Address,
    /// Chain head after this answer was recorded.
    pub history_hash: B256,
    /// Bond backing the answer.
    pub bond: U256,
    /// The answer itself.
    pub answer: B256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(ReasonedPhase::PartiallyExecuted(2).to_string(), "partially-executed(2)");
        assert_eq!(AssertionPhase::Expired.to_string(), "expired");
        assert_eq!(
            ProposalPhase::Reasoned(ReasonedPhase::Finalized).to_string(),
            "finalized"
        );
    }
}
