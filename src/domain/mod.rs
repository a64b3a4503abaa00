//! Domain layer - core protocol logic and models.
//!
//! Pure logic for the execution-authorization protocol: transaction
//! batching, content addressing, bond escalation, and proposal lifecycle
//! types. No I/O here (hexagonal architecture inner ring); everything is
//! deterministic and testable in isolation.

pub mod batch;
pub mod bond;
pub mod error;
pub mod hashing;
pub mod proposal;
pub mod transaction;

// Re-export core types for convenience
pub use batch::{SafeVersion, decode_batch, encode_batch, multisend_address};
pub use bond::{Bond, allowance_sufficient, build_approval, required_bond};
pub use error::ExecError;
pub use hashing::{proposal_hash, transaction_hash, transaction_hashes};
pub use proposal::{
    AssertionPhase, DisputeHistoryEntry, ModuleState, OracleReference, Proposal, ProposalPhase,
    ReasonedPhase,
};
pub use transaction::{ExecutionBatch, ModuleTransaction, Operation, ProposalId};
