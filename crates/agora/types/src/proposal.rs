//! Proposal identity and per-proposal state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::{decode_prefixed, hex_bytes, Address, HexError};
use crate::{Timestamp, Weight};

/// Domain separator for proposal id derivation (encoding version 1).
///
/// Any consumer recomputing ids must reproduce the v1 encoding bit-exactly:
/// `blake3(DOMAIN || target[20] || u64_le(len(payload)) || payload || u64_le(len(memo)) || memo)`.
pub const PROPOSAL_ID_DOMAIN: &[u8] = b"agora/proposal-id/v1";

/// Content-addressed proposal identifier (BLAKE3, 32 bytes).
///
/// Two logically identical proposals always derive the same id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposalId(pub [u8; 32]);

impl ProposalId {
    /// Derive the id of the proposal `(target, payload, memo)`.
    pub fn derive(target: &Address, payload: &[u8], memo: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(PROPOSAL_ID_DOMAIN);
        hasher.update(target.as_bytes());
        hasher.update(&(payload.len() as u64).to_le_bytes());
        hasher.update(payload);
        hasher.update(&(memo.len() as u64).to_le_bytes());
        hasher.update(memo);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Zero id, reported for absent proposals.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let bytes = decode_prefixed(s)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| HexError::InvalidLength {
            expected: 32,
            actual: v.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ProposalId {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ProposalId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProposalId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ProposalId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The full content of a proposal: what to call, with which payload, and a free-form memo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub target: Address,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    #[serde(with = "hex_bytes", default)]
    pub memo: Vec<u8>,
}

impl Message {
    pub fn new(target: Address, payload: impl Into<Vec<u8>>, memo: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            payload: payload.into(),
            memo: memo.into(),
        }
    }

    /// The content-addressed id of this message.
    pub fn id(&self) -> ProposalId {
        ProposalId::derive(&self.target, &self.payload, &self.memo)
    }
}

/// Execution outcome recorded on a proposal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[default]
    NotExecuted,
    Executed,
    ExecutionFailed,
}

/// A stored proposal.
///
/// Absent proposals are reported as [`Proposal::absent`]: every field zeroed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub create_time: Timestamp,
    pub yes_weight: Weight,
    pub no_weight: Weight,
    pub status: ExecutionStatus,
}

impl Proposal {
    pub fn new(id: ProposalId, create_time: Timestamp) -> Self {
        Self {
            id,
            create_time,
            yes_weight: 0,
            no_weight: 0,
            status: ExecutionStatus::NotExecuted,
        }
    }

    pub fn absent() -> Self {
        Self::new(ProposalId::zero(), 0)
    }
}

/// Vote type. `None` is the null vote and is never accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    #[default]
    None,
    Yes,
    No,
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(VoteType::Yes),
            "no" => Ok(VoteType::No),
            "none" => Ok(VoteType::None),
            other => Err(format!("unknown vote type: {other}")),
        }
    }
}

/// A voter's current vote on one proposal and the weight it was cast with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: Address,
    pub vtype: VoteType,
    pub weight: Weight,
}

impl VoteRecord {
    /// The record reported for a voter who has not voted.
    pub fn empty(voter: Address) -> Self {
        Self {
            voter,
            vtype: VoteType::None,
            weight: 0,
        }
    }
}
