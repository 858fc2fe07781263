//! Anti-spam cap on live Yes votes.
//!
//! Each voter may hold Yes votes on at most `max_live_yes_votes` live
//! proposals at once, regardless of weight. A proposal stops counting when it
//! expires, is executed, or is cancelled. Expiry is passive, so liveness is
//! evaluated by the caller at check time rather than tracked here.

use std::collections::{BTreeSet, HashMap};

use agora_types::{Address, ProposalId};

/// Per-voter set of proposals the voter holds a Yes vote on.
#[derive(Debug, Default, Clone)]
pub struct SpamGuard {
    yes_votes: HashMap<Address, BTreeSet<ProposalId>>,
}

impl SpamGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of the voter's Yes-voted proposals that are still live.
    pub fn live_count(&self, voter: &Address, is_live: impl Fn(&ProposalId) -> bool) -> usize {
        self.yes_votes
            .get(voter)
            .map(|held| held.iter().filter(|id| is_live(id)).count())
            .unwrap_or(0)
    }

    /// Whether the voter already occupies a slot for this proposal.
    pub fn holds(&self, voter: &Address, id: &ProposalId) -> bool {
        self.yes_votes
            .get(voter)
            .is_some_and(|held| held.contains(id))
    }

    pub fn hold(&mut self, voter: Address, id: ProposalId) {
        self.yes_votes.entry(voter).or_default().insert(id);
    }

    pub fn release(&mut self, voter: &Address, id: &ProposalId) {
        if let Some(held) = self.yes_votes.get_mut(voter) {
            held.remove(id);
            if held.is_empty() {
                self.yes_votes.remove(voter);
            }
        }
    }

    /// Forget the voter's slots on proposals that are no longer live.
    pub fn prune(&mut self, voter: &Address, is_live: impl Fn(&ProposalId) -> bool) {
        if let Some(held) = self.yes_votes.get_mut(voter) {
            held.retain(|id| is_live(id));
            if held.is_empty() {
                self.yes_votes.remove(voter);
            }
        }
    }
}
