//! Bonded Write Flow - Discrete Approve-Then-Submit Steps
//!
//! A bonded write is two broadcasts with a verification between them:
//! approve the bond currency, wait for inclusion, re-check the allowance
//! (approvals are not atomic with the write), then submit the bonded call.
//! Instead of suspending a coroutine across that sequence, the flow is an
//! explicit state machine: each `advance` performs one discrete step and
//! reports a status callers can poll or subscribe to.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use tracing::{info, instrument, warn};

use crate::domain::error::ExecError;
use crate::ports::gateway::{EvmGateway, TxRequest};

sol! {
    function allowance(address owner, address spender) external view returns (uint256);
}

/// Where a bonded write currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    /// The approval broadcast has not happened yet.
    PendingApproval,
    /// A broadcast is in flight or its effect is unverified.
    PendingConfirmation,
    /// The bonded write confirmed.
    Done,
    /// The flow stopped; the reason is final.
    Failed(String),
}

/// The allowance that must hold before the bonded write goes out.
#[derive(Debug, Clone, Copy)]
pub struct AllowanceRequirement {
    /// Bond currency.
    pub token: Address,
    /// Contract that will pull the bond.
    pub spender: Address,
    /// Minimum allowance.
    pub required: U256,
}

enum FlowState {
    NeedApproval,
    NeedRecheck,
    NeedSubmit,
    Done,
    Failed(String),
}

/// One bonded write: optional approval, allowance re-check, submission.
pub struct BondedWriteFlow {
    approval: Option<TxRequest>,
    requirement: Option<AllowanceRequirement>,
    submit: TxRequest,
    state: FlowState,
}

impl BondedWriteFlow {
    /// A flow with a prerequisite ERC-20 approval.
    pub fn with_approval(
        approval: TxRequest,
        requirement: AllowanceRequirement,
        submit: TxRequest,
    ) -> Self {
        Self {
            approval: Some(approval),
            requirement: Some(requirement),
            submit,
            state: FlowState::NeedApproval,
        }
    }

    /// A flow that can submit immediately (native bond or standing
    /// allowance).
    pub fn direct(submit: TxRequest) -> Self {
        Self {
            approval: None,
            requirement: None,
            submit,
            state: FlowState::NeedSubmit,
        }
    }

    /// Current status without performing work.
    pub fn status(&self) -> FlowStatus {
        match &self.state {
            FlowState::NeedApproval => FlowStatus::PendingApproval,
            FlowState::NeedRecheck | FlowState::NeedSubmit => FlowStatus::PendingConfirmation,
            FlowState::Done => FlowStatus::Done,
            FlowState::Failed(reason) => FlowStatus::Failed(reason.clone()),
        }
    }

    /// Perform the next discrete step and report the resulting status.
    ///
    /// Transport errors propagate without consuming the step, so callers
    /// may retry `advance`. On-chain reverts and failed re-checks are
    /// final: the flow moves to `Failed`.
    #[instrument(skip_all)]
    pub async fn advance(&mut self, gateway: &dyn EvmGateway) -> Result<FlowStatus, ExecError> {
        match &self.state {
            FlowState::NeedApproval => {
                let approval = self.approval.as_ref().expect("approval state requires tx");
                let outcome = gateway.send_transaction(approval).await?;
                if outcome.success {
                    info!(tx = %outcome.tx_hash, "Approval confirmed");
                    self.state = FlowState::NeedRecheck;
                } else {
                    warn!(tx = %outcome.tx_hash, "Approval reverted");
                    self.state = FlowState::Failed("approval reverted".into());
                }
            }
            FlowState::NeedRecheck => {
                let requirement = self
                    .requirement
                    .expect("recheck state requires a requirement");
                let Some(owner) = gateway.account() else {
                    self.state = FlowState::Failed("no posting account configured".into());
                    return Ok(self.status());
                };

                let raw = gateway
                    .call(
                        requirement.token,
                        Bytes::from(
                            allowanceCall {
                                owner,
                                spender: requirement.spender,
                            }
                            .abi_encode(),
                        ),
                    )
                    .await?;
                let current = allowanceCall::abi_decode_returns(&raw, true)
                    .map_err(|e| ExecError::decode("allowance()", e))?
                    ._0;

                if current >= requirement.required {
                    self.state = FlowState::NeedSubmit;
                } else {
                    self.state = FlowState::Failed(format!(
                        "allowance {current} below required {} after approval",
                        requirement.required
                    ));
                }
            }
            FlowState::NeedSubmit => {
                let outcome = gateway.send_transaction(&self.submit).await?;
                if outcome.success {
                    info!(tx = %outcome.tx_hash, "Bonded write confirmed");
                    self.state = FlowState::Done;
                } else {
                    self.state = FlowState::Failed(format!(
                        "bonded write reverted ({})",
                        outcome
                            .revert_reason
                            .as_deref()
                            .unwrap_or("no reason reported")
                    ));
                }
            }
            FlowState::Done | FlowState::Failed(_) => {}
        }

        Ok(self.status())
    }
}
