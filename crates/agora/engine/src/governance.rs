//! Handlers for the engine's own governance calls.
//!
//! These run only while the executor is carrying out a passed proposal
//! addressed to the engine, which is what the [`SelfCall`] witness attests.

use agora_types::{GovernanceCall, GovernanceError, GovernanceEvent, Settings, Timestamp};
use tracing::info;

use crate::executor::SelfCall;
use crate::oracle::OracleRegistry;
use crate::state::EngineState;

/// Apply a decoded governance call. On error the state is untouched.
pub(crate) fn apply(
    state: &mut EngineState,
    call: GovernanceCall,
    oracles: &OracleRegistry,
    now: Timestamp,
    _authority: &SelfCall,
) -> Result<Vec<GovernanceEvent>, GovernanceError> {
    match call {
        GovernanceCall::CancelProposal { id } => {
            if !state.stage_of(&id, now)?.is_live() {
                return Err(GovernanceError::ProposalExpired(id));
            }
            state.delete_proposal(&id);
            info!(proposal_id = %id, "proposal canceled");
            Ok(vec![GovernanceEvent::ProposalCanceled { id }])
        }
        GovernanceCall::Signal { signal_type, data } => {
            info!(signal_type = %signal_type, bytes = data.len(), "signal emitted");
            Ok(vec![GovernanceEvent::Signal { signal_type, data }])
        }
        GovernanceCall::SetPeriodLengths {
            vote_period,
            veto_period,
        } => update_settings(state, |s| {
            s.vote_period = vote_period;
            s.veto_period = veto_period;
        }),
        GovernanceCall::SetMinWeight { min_yes_weight } => {
            update_settings(state, |s| s.min_yes_weight = min_yes_weight)
        }
        GovernanceCall::SetWeightOracle { oracle } => {
            if !oracles.contains(&oracle) {
                return Err(GovernanceError::UnknownWeightOracle(oracle));
            }
            update_settings(state, |s| s.weight_oracle = oracle)
        }
        GovernanceCall::SetMaxLiveVotes { max_live_yes_votes } => {
            update_settings(state, |s| s.max_live_yes_votes = max_live_yes_votes)
        }
    }
}

fn update_settings(
    state: &mut EngineState,
    change: impl FnOnce(&mut Settings),
) -> Result<Vec<GovernanceEvent>, GovernanceError> {
    let mut settings = state.settings().clone();
    change(&mut settings);
    settings.validate()?;
    info!(?settings, "settings updated");
    state.settings = settings.clone();
    Ok(vec![GovernanceEvent::SettingsUpdated { settings }])
}
