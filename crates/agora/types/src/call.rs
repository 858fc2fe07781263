//! Governance calls: the payloads a proposal addressed to the engine carries.
//!
//! The engine's own settings, cancellation, and signals are not part of its
//! public surface. They are reachable only by executing a passed proposal
//! whose target is the engine address and whose payload decodes to a
//! [`GovernanceCall`].

use serde::{Deserialize, Serialize};

use crate::address::{hex_bytes, Address};
use crate::error::GovernanceError;
use crate::proposal::{Message, ProposalId};
use crate::Weight;

/// Reserved signal type used by external consumers to count discrete periods.
pub const TICK_SIGNAL: &str = "tick";

/// A self-addressed governance operation.
///
/// Encoded as JSON tagged by `call`, e.g.
/// `{"call":"set_min_weight","min_yes_weight":5}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum GovernanceCall {
    /// Delete a proposal outright, releasing its votes.
    CancelProposal { id: ProposalId },
    /// Emit an out-of-band, tamper-proof signal.
    Signal {
        signal_type: String,
        #[serde(with = "hex_bytes", default)]
        data: Vec<u8>,
    },
    SetPeriodLengths { vote_period: u64, veto_period: u64 },
    SetMinWeight { min_yes_weight: Weight },
    SetWeightOracle { oracle: Address },
    SetMaxLiveVotes { max_live_yes_votes: u32 },
}

impl GovernanceCall {
    pub fn tick(data: impl Into<Vec<u8>>) -> Self {
        GovernanceCall::Signal {
            signal_type: TICK_SIGNAL.to_string(),
            data: data.into(),
        }
    }

    /// Encode as proposal payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, GovernanceError> {
        serde_json::from_slice(payload).map_err(|e| GovernanceError::InvalidCall(e.to_string()))
    }

    /// Build the proposal message that would carry this call to `engine`.
    pub fn into_message(self, engine: Address, memo: impl Into<Vec<u8>>) -> Message {
        Message::new(engine, self.encode(), memo)
    }
}
