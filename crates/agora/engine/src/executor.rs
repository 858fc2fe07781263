//! Gas-bounded execution of passed proposals.
//!
//! The executor forwards a bounded slice of the caller's gas budget to the
//! target and splits failures in two:
//! - the call ran dry on gas the *caller* capped: the whole `execute` aborts
//!   with [`GovernanceError::OutOfGas`] and nothing changes, so the proposal
//!   can be retried with a larger budget;
//! - anything else is the callee's failure: the proposal is recorded as
//!   `ExecutionFailed` and deleted.
//!
//! Proposals addressed to the engine itself are decoded as
//! [`GovernanceCall`]s and applied in-process; they draw no gas.

use std::time::Duration;

use agora_types::{
    hex_bytes, Address, ExecutionStatus, GovernanceCall, GovernanceError, GovernanceEvent,
    Message, ProposalId, Stage, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GasConfig;
use crate::governance;
use crate::oracle::OracleRegistry;
use crate::state::EngineState;
use crate::target::{CallFailure, CallRequest, GasMeter, TargetRegistry};

/// Gas the caller of `execute` makes available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionBudget {
    pub gas: u64,
}

impl ExecutionBudget {
    pub fn new(gas: u64) -> Self {
        Self { gas }
    }
}

/// What `execute` reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub id: ProposalId,
    pub status: ExecutionStatus,
    #[serde(with = "hex_bytes")]
    pub return_value: Vec<u8>,
    pub gas_used: u64,
}

/// Witness that a governance call is being applied by the executor on
/// behalf of a passed self-addressed proposal. Only this module can mint one.
pub(crate) struct SelfCall {
    _sealed: (),
}

pub(crate) struct Executor<'a> {
    engine: Address,
    gas: GasConfig,
    call_timeout: Duration,
    targets: &'a TargetRegistry,
    oracles: &'a OracleRegistry,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(
        engine: Address,
        gas: GasConfig,
        call_timeout: Duration,
        targets: &'a TargetRegistry,
        oracles: &'a OracleRegistry,
    ) -> Self {
        Self {
            engine,
            gas,
            call_timeout,
            targets,
            oracles,
        }
    }

    /// Gas forwarded to the target for a given budget.
    fn forwarded_gas(&self, budget: ExecutionBudget) -> Result<u64, GovernanceError> {
        let required = self.gas.minimum_budget();
        if budget.gas < required {
            return Err(GovernanceError::OutOfGas {
                supplied: budget.gas,
                required,
            });
        }
        Ok(budget
            .gas
            .saturating_sub(self.gas.bookkeeping_reserve)
            .min(self.gas.max_call_gas))
    }

    pub(crate) async fn execute(
        &self,
        state: &mut EngineState,
        message: &Message,
        budget: ExecutionBudget,
        now: Timestamp,
    ) -> Result<(ExecutionReceipt, Vec<GovernanceEvent>), GovernanceError> {
        let id = message.id();
        if state.stage_of(&id, now)? != Stage::Execution {
            return Err(GovernanceError::ProposalNotPassed(id));
        }

        let forwarded = self.forwarded_gas(budget)?;
        let caller_limited = forwarded < self.gas.max_call_gas;
        let meter = GasMeter::new(forwarded);

        let mut events = Vec::new();
        let self_call = message.target == self.engine;
        let result = if self_call {
            self.dispatch_self(state, &message.payload, now, &mut events)
        } else {
            self.dispatch_external(id, message, &meter).await
        };

        let (status, return_value) = match result {
            Ok(value) => (ExecutionStatus::Executed, value),
            Err(failure) => {
                let starved = caller_limited
                    && meter.is_exhausted()
                    && failure != CallFailure::TimedOut;
                // Self-calls draw no gas.
                if starved && !self_call {
                    debug!(
                        proposal_id = %id,
                        supplied = budget.gas,
                        forwarded,
                        "call starved by caller budget, aborting"
                    );
                    return Err(GovernanceError::OutOfGas {
                        supplied: budget.gas,
                        required: self.gas.full_budget(),
                    });
                }
                warn!(proposal_id = %id, error = %failure, "proposal execution failed");
                (ExecutionStatus::ExecutionFailed, failure.payload())
            }
        };

        // A self-call may already have cancelled this proposal.
        state.delete_proposal(&id);
        events.push(match status {
            ExecutionStatus::Executed => GovernanceEvent::Executed {
                id,
                return_value: return_value.clone(),
            },
            _ => GovernanceEvent::ExecutionFailed {
                id,
                return_value: return_value.clone(),
            },
        });

        let receipt = ExecutionReceipt {
            id,
            status,
            return_value,
            gas_used: meter.used(),
        };
        Ok((receipt, events))
    }

    fn dispatch_self(
        &self,
        state: &mut EngineState,
        payload: &[u8],
        now: Timestamp,
        events: &mut Vec<GovernanceEvent>,
    ) -> Result<Vec<u8>, CallFailure> {
        let authority = SelfCall { _sealed: () };
        let applied = GovernanceCall::decode(payload)
            .and_then(|call| governance::apply(state, call, self.oracles, now, &authority));
        match applied {
            Ok(mut emitted) => {
                events.append(&mut emitted);
                Ok(Vec::new())
            }
            Err(err) => Err(CallFailure::revert(err.to_string())),
        }
    }

    async fn dispatch_external(
        &self,
        id: ProposalId,
        message: &Message,
        meter: &GasMeter,
    ) -> Result<Vec<u8>, CallFailure> {
        let Some(target) = self.targets.get(&message.target) else {
            return Err(CallFailure::revert(format!(
                "no call target registered at {}",
                message.target
            )));
        };
        let request = CallRequest {
            proposal: id,
            caller: self.engine,
            target: message.target,
            payload: message.payload.clone(),
        };
        match tokio::time::timeout(self.call_timeout, target.call(&request, meter)).await {
            Ok(result) => result,
            Err(_) => Err(CallFailure::TimedOut),
        }
    }
}
