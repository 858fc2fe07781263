//! Governance error taxonomy.

use thiserror::Error;

use crate::address::Address;
use crate::proposal::ProposalId;

/// Errors surfaced to callers of the governance engine.
///
/// Every error aborts the whole operation with no state change. A failed
/// proposal execution is not an error: it is reported as data on the
/// execution receipt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("invalid vote type: the null vote is never accepted")]
    InvalidVoteType,

    #[error("vote period over for proposal {0}")]
    VotePeriodOver(ProposalId),

    #[error("proposal {0} no longer accepts votes")]
    ProposalVoteInactive(ProposalId),

    #[error("already voted on proposal {0} with the same type and weight")]
    AlreadyVoted(ProposalId),

    #[error("voter {voter} already holds {limit} live yes votes")]
    MaxLiveYesVotesExceeded { voter: Address, limit: u32 },

    #[error("proposal {0} has not passed")]
    ProposalNotPassed(ProposalId),

    #[error("out of gas: supplied {supplied}, required at least {required}")]
    OutOfGas { supplied: u64, required: u64 },

    #[error("unauthorized caller {0}: governance calls are only reachable through proposal execution")]
    Unauthorized(Address),

    #[error("proposal already exists: {0}")]
    ProposalAlreadyExists(ProposalId),

    #[error("proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} has expired")]
    ProposalExpired(ProposalId),

    #[error("weight oracle unavailable: {0}")]
    WeightOracleUnavailable(String),

    #[error("no weight oracle registered at {0}")]
    UnknownWeightOracle(Address),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid governance call: {0}")]
    InvalidCall(String),

    #[error("weight overflow on proposal {0}")]
    WeightOverflow(ProposalId),
}
