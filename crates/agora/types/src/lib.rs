#![deny(unsafe_code)]
//! Core data model for the Agora governance engine.
//!
//! This crate provides:
//! - **Identity** types: [`Address`] and the content-addressed [`ProposalId`].
//! - **Proposal state**: [`Proposal`], [`VoteRecord`], [`VoteType`], [`ExecutionStatus`].
//! - **Settings** governed by the engine itself ([`Settings`]).
//! - **Stage rules**: the pure [`stage_at`] clock and the pass/fail [`is_passing`] threshold.
//! - **Governance calls** ([`GovernanceCall`]) that a proposal addressed to the
//!   engine carries as its payload.
//! - **Events** ([`GovernanceEvent`], [`EventRecord`]) and the error taxonomy
//!   ([`GovernanceError`]).

pub mod address;
pub mod call;
pub mod error;
pub mod event;
pub mod proposal;
pub mod settings;
pub mod stage;

pub use address::{hex_bytes, Address, HexError};
pub use call::{GovernanceCall, TICK_SIGNAL};
pub use error::GovernanceError;
pub use event::{EventRecord, GovernanceEvent};
pub use proposal::{
    ExecutionStatus, Message, Proposal, ProposalId, VoteRecord, VoteType, PROPOSAL_ID_DOMAIN,
};
pub use settings::Settings;
pub use stage::{is_passing, stage_at, Stage, VoteStatus};

/// Logical time in seconds, as supplied by the engine clock.
pub type Timestamp = u64;

/// Voting weight reported by a weight oracle.
pub type Weight = u64;
