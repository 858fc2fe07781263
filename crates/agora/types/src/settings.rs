//! Engine parameters, mutable only through the engine's own governance.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::GovernanceError;
use crate::{Timestamp, Weight};

/// Default voting window: 24 hours in seconds.
pub const DEFAULT_VOTE_PERIOD: u64 = 86_400;

/// Default veto window: 6 days in seconds.
pub const DEFAULT_VETO_PERIOD: u64 = 518_400;

/// Default anti-spam cap on simultaneously live Yes votes per voter.
pub const DEFAULT_MAX_LIVE_YES_VOTES: u32 = 4;

/// Governance parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Length of the voting window in seconds.
    pub vote_period: u64,
    /// Length of the veto window that follows voting, in seconds.
    pub veto_period: u64,
    /// Minimum accumulated Yes weight for a proposal to pass.
    pub min_yes_weight: Weight,
    /// Maximum number of live proposals a voter may hold a Yes vote on.
    pub max_live_yes_votes: u32,
    /// Address of the weight oracle consulted at vote time.
    pub weight_oracle: Address,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vote_period: DEFAULT_VOTE_PERIOD,
            veto_period: DEFAULT_VETO_PERIOD,
            min_yes_weight: 1,
            max_live_yes_votes: DEFAULT_MAX_LIVE_YES_VOTES,
            weight_oracle: Address::derive(b"agora/weight-oracle"),
        }
    }
}

impl Settings {
    /// End of the voting window for a proposal created at `create_time`.
    pub fn vote_end(&self, create_time: Timestamp) -> Timestamp {
        create_time.saturating_add(self.vote_period)
    }

    /// End of the veto window (start of execution eligibility).
    pub fn veto_end(&self, create_time: Timestamp) -> Timestamp {
        self.vote_end(create_time).saturating_add(self.veto_period)
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.vote_period == 0 {
            return Err(GovernanceError::InvalidSettings(
                "vote period must be greater than zero".into(),
            ));
        }
        if self.max_live_yes_votes == 0 {
            return Err(GovernanceError::InvalidSettings(
                "max live yes votes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
