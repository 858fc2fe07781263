//! Engine state and the synchronous rules that mutate it.
//!
//! Mutating methods run under the engine's mutation lock; queries run
//! against a committed clone. Every mutation is all-or-nothing: a method
//! that returns an error has left the state untouched. Events produced by a
//! successful mutation are returned to the caller for publication after
//! commit.

use agora_types::{
    Address, GovernanceError, GovernanceEvent, Proposal, ProposalId, Settings, Stage, Timestamp,
    VoteRecord, VoteStatus, VoteType, Weight,
};
use serde::{Deserialize, Serialize};

use crate::spam_guard::SpamGuard;
use crate::store::{ProposalStore, VoteLedger};

/// All mutable engine data.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub(crate) settings: Settings,
    proposals: ProposalStore,
    votes: VoteLedger,
    spam_guard: SpamGuard,
}

/// Point-in-time view of a single proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    pub proposal: Proposal,
    pub stage: Stage,
    pub vote_status: VoteStatus,
    pub votes: Vec<VoteRecord>,
}

/// Point-in-time view of the whole engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub at: Timestamp,
    pub settings: Settings,
    /// Most recently created first.
    pub proposals: Vec<ProposalView>,
}

fn is_live(proposals: &ProposalStore, settings: &Settings, id: &ProposalId, now: Timestamp) -> bool {
    proposals
        .get(id)
        .is_some_and(|p| p.stage(settings, now).is_live())
}

impl EngineState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            proposals: ProposalStore::new(),
            votes: VoteLedger::new(),
            spam_guard: SpamGuard::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn proposal(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn stage_of(&self, id: &ProposalId, now: Timestamp) -> Result<Stage, GovernanceError> {
        self.proposals
            .get(id)
            .map(|p| p.stage(&self.settings, now))
            .ok_or(GovernanceError::ProposalNotFound(*id))
    }

    pub fn vote_status_of(
        &self,
        id: &ProposalId,
        now: Timestamp,
    ) -> Result<VoteStatus, GovernanceError> {
        self.proposals
            .get(id)
            .map(|p| p.vote_status(&self.settings, now))
            .ok_or(GovernanceError::ProposalNotFound(*id))
    }

    pub fn vote_of(&self, id: &ProposalId, voter: &Address) -> VoteRecord {
        self.votes
            .get(id, voter)
            .cloned()
            .unwrap_or_else(|| VoteRecord::empty(*voter))
    }

    /// Number of live proposals the voter currently holds a Yes vote on.
    pub fn live_yes_votes(&self, voter: &Address, now: Timestamp) -> usize {
        self.spam_guard
            .live_count(voter, |id| is_live(&self.proposals, &self.settings, id, now))
    }

    /// Register a proposal. An expired proposal with the same id is replaced
    /// by a fresh one.
    pub fn propose(
        &mut self,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<Vec<GovernanceEvent>, GovernanceError> {
        if let Some(existing) = self.proposals.get(&id) {
            if existing.stage(&self.settings, now).is_live() {
                return Err(GovernanceError::ProposalAlreadyExists(id));
            }
            self.delete_proposal(&id);
        }
        self.proposals.insert(Proposal::new(id, now));
        Ok(vec![GovernanceEvent::ProposalCreated { id }])
    }

    /// The staged proposal a vote would act on: the stored one, or a fresh
    /// one created at `now` if none exists.
    fn staged(&self, id: &ProposalId, now: Timestamp) -> (Proposal, bool) {
        match self.proposals.get(id) {
            Some(proposal) => (proposal.clone(), false),
            None => (Proposal::new(*id, now), true),
        }
    }

    /// Stage-level checks for a vote, made before the voter's weight is
    /// looked up.
    pub fn admit_vote(
        &self,
        id: &ProposalId,
        vtype: VoteType,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let (proposal, _) = self.staged(id, now);
        let stage = proposal.stage(&self.settings, now);
        match vtype {
            VoteType::None => Err(GovernanceError::InvalidVoteType),
            VoteType::Yes if stage != Stage::Voting => Err(GovernanceError::VotePeriodOver(*id)),
            VoteType::No if !matches!(stage, Stage::Voting | Stage::Veto) => {
                Err(GovernanceError::ProposalVoteInactive(*id))
            }
            _ => Ok(()),
        }
    }

    /// Cast, change, or re-weight a vote.
    ///
    /// A vote on an unknown id creates the proposal; the creation is only
    /// kept if the vote itself succeeds.
    pub fn apply_vote(
        &mut self,
        id: ProposalId,
        voter: Address,
        vtype: VoteType,
        weight: Weight,
        memo: &[u8],
        now: Timestamp,
    ) -> Result<Vec<GovernanceEvent>, GovernanceError> {
        self.admit_vote(&id, vtype, now)?;
        let (mut proposal, created) = self.staged(&id, now);

        let previous = self.vote_of(&id, &voter);
        if previous.vtype == vtype && previous.weight == weight {
            return Err(GovernanceError::AlreadyVoted(id));
        }

        if vtype == VoteType::Yes && !self.spam_guard.holds(&voter, &id) {
            let limit = self.settings.max_live_yes_votes;
            if self.live_yes_votes(&voter, now) >= limit as usize {
                return Err(GovernanceError::MaxLiveYesVotesExceeded { voter, limit });
            }
        }

        match previous.vtype {
            VoteType::Yes => {
                proposal.yes_weight = proposal.yes_weight.saturating_sub(previous.weight);
            }
            VoteType::No => {
                proposal.no_weight = proposal.no_weight.saturating_sub(previous.weight);
            }
            VoteType::None => {}
        }
        let aggregate = match vtype {
            VoteType::Yes => &mut proposal.yes_weight,
            _ => &mut proposal.no_weight,
        };
        *aggregate = aggregate
            .checked_add(weight)
            .ok_or(GovernanceError::WeightOverflow(id))?;

        // Commit.
        self.proposals.insert(proposal);
        self.votes.record(
            id,
            VoteRecord {
                voter,
                vtype,
                weight,
            },
        );
        if vtype == VoteType::Yes {
            let proposals = &self.proposals;
            let settings = &self.settings;
            self.spam_guard
                .prune(&voter, |held| is_live(proposals, settings, held, now));
            self.spam_guard.hold(voter, id);
        } else if previous.vtype == VoteType::Yes {
            self.spam_guard.release(&voter, &id);
        }

        let mut events = Vec::with_capacity(2);
        if created {
            events.push(GovernanceEvent::ProposalCreated { id });
        }
        events.push(GovernanceEvent::Voted {
            id,
            voter,
            vtype,
            weight,
            memo: memo.to_vec(),
        });
        Ok(events)
    }

    /// Remove a proposal with all of its votes, freeing the voters' slots.
    pub fn delete_proposal(&mut self, id: &ProposalId) -> Option<Proposal> {
        let removed = self.proposals.remove(id)?;
        for voter in self.votes.remove_proposal(id) {
            self.spam_guard.release(&voter, id);
        }
        Some(removed)
    }

    pub fn snapshot(&self, now: Timestamp) -> EngineSnapshot {
        let proposals = self
            .proposals
            .by_recency()
            .into_iter()
            .map(|p| ProposalView {
                proposal: p.clone(),
                stage: p.stage(&self.settings, now),
                vote_status: p.vote_status(&self.settings, now),
                votes: self.votes.votes_on(&p.id),
            })
            .collect();
        EngineSnapshot {
            at: now,
            settings: self.settings.clone(),
            proposals,
        }
    }
}
