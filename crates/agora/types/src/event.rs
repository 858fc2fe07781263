//! Events published by the engine. Indexers learn about state changes only through these.

use serde::{Deserialize, Serialize};

use crate::address::{hex_bytes, Address};
use crate::proposal::{ProposalId, VoteType};
use crate::settings::Settings;
use crate::{Timestamp, Weight};

/// A governance event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GovernanceEvent {
    ProposalCreated {
        id: ProposalId,
    },
    Voted {
        id: ProposalId,
        voter: Address,
        vtype: VoteType,
        weight: Weight,
        #[serde(with = "hex_bytes")]
        memo: Vec<u8>,
    },
    Executed {
        id: ProposalId,
        #[serde(with = "hex_bytes")]
        return_value: Vec<u8>,
    },
    ExecutionFailed {
        id: ProposalId,
        #[serde(with = "hex_bytes")]
        return_value: Vec<u8>,
    },
    Signal {
        signal_type: String,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
    ProposalCanceled {
        id: ProposalId,
    },
    SettingsUpdated {
        settings: Settings,
    },
}

impl GovernanceEvent {
    /// The proposal this event concerns, if any.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            GovernanceEvent::ProposalCreated { id }
            | GovernanceEvent::Voted { id, .. }
            | GovernanceEvent::Executed { id, .. }
            | GovernanceEvent::ExecutionFailed { id, .. }
            | GovernanceEvent::ProposalCanceled { id } => Some(*id),
            GovernanceEvent::Signal { .. } | GovernanceEvent::SettingsUpdated { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GovernanceEvent::ProposalCreated { .. } => "proposal_created",
            GovernanceEvent::Voted { .. } => "voted",
            GovernanceEvent::Executed { .. } => "executed",
            GovernanceEvent::ExecutionFailed { .. } => "execution_failed",
            GovernanceEvent::Signal { .. } => "signal",
            GovernanceEvent::ProposalCanceled { .. } => "proposal_canceled",
            GovernanceEvent::SettingsUpdated { .. } => "settings_updated",
        }
    }
}

/// A committed event with its position in the engine's event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonically increasing sequence number, starting at 1.
    pub seq: u64,
    /// Clock reading of the operation that produced the event.
    pub at: Timestamp,
    pub event: GovernanceEvent,
}
