//! Proposal store and vote ledger.

use std::collections::{BTreeMap, HashMap};

use agora_types::{Address, Proposal, ProposalId, VoteRecord};

/// Proposals keyed by their content-derived id.
#[derive(Debug, Default, Clone)]
pub struct ProposalStore {
    proposals: HashMap<ProposalId, Proposal>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn contains(&self, id: &ProposalId) -> bool {
        self.proposals.contains_key(id)
    }

    pub fn insert(&mut self, proposal: Proposal) {
        self.proposals.insert(proposal.id, proposal);
    }

    pub fn remove(&mut self, id: &ProposalId) -> Option<Proposal> {
        self.proposals.remove(id)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// All proposals, most recently created first.
    pub fn by_recency(&self) -> Vec<&Proposal> {
        let mut proposals: Vec<&Proposal> = self.proposals.values().collect();
        proposals.sort_by(|a, b| b.create_time.cmp(&a.create_time).then(a.id.cmp(&b.id)));
        proposals
    }
}

/// Each voter's current vote on each proposal.
#[derive(Debug, Default, Clone)]
pub struct VoteLedger {
    votes: HashMap<ProposalId, BTreeMap<Address, VoteRecord>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ProposalId, voter: &Address) -> Option<&VoteRecord> {
        self.votes.get(id).and_then(|votes| votes.get(voter))
    }

    /// Store (or overwrite) a voter's record on a proposal.
    pub fn record(&mut self, id: ProposalId, record: VoteRecord) {
        self.votes.entry(id).or_default().insert(record.voter, record);
    }

    /// All records on a proposal, ordered by voter.
    pub fn votes_on(&self, id: &ProposalId) -> Vec<VoteRecord> {
        self.votes
            .get(id)
            .map(|votes| votes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every record on a proposal, returning the voters that held one.
    pub fn remove_proposal(&mut self, id: &ProposalId) -> Vec<Address> {
        self.votes
            .remove(id)
            .map(|votes| votes.into_keys().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::VoteType;

    fn id(seed: u8) -> ProposalId {
        ProposalId::from_bytes([seed; 32])
    }

    #[test]
    fn store_insert_get_remove() {
        let mut store = ProposalStore::new();
        store.insert(Proposal::new(id(1), 100));
        assert!(store.contains(&id(1)));
        assert_eq!(store.get(&id(1)).unwrap().create_time, 100);
        assert_eq!(store.remove(&id(1)).unwrap().id, id(1));
        assert!(store.is_empty());
    }

    #[test]
    fn recency_orders_newest_first() {
        let mut store = ProposalStore::new();
        store.insert(Proposal::new(id(1), 100));
        store.insert(Proposal::new(id(2), 300));
        store.insert(Proposal::new(id(3), 200));
        let order: Vec<ProposalId> = store.by_recency().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![id(2), id(3), id(1)]);
    }

    #[test]
    fn ledger_overwrites_and_removes() {
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        let mut ledger = VoteLedger::new();
        ledger.record(
            id(1),
            VoteRecord {
                voter: alice,
                vtype: VoteType::Yes,
                weight: 8,
            },
        );
        ledger.record(
            id(1),
            VoteRecord {
                voter: alice,
                vtype: VoteType::No,
                weight: 8,
            },
        );
        ledger.record(
            id(1),
            VoteRecord {
                voter: bob,
                vtype: VoteType::No,
                weight: 5,
            },
        );

        assert_eq!(ledger.get(&id(1), &alice).unwrap().vtype, VoteType::No);
        assert_eq!(ledger.votes_on(&id(1)).len(), 2);

        let mut voters = ledger.remove_proposal(&id(1));
        voters.sort();
        let mut expected = vec![alice, bob];
        expected.sort();
        assert_eq!(voters, expected);
        assert!(ledger.get(&id(1), &alice).is_none());
        assert!(ledger.remove_proposal(&id(1)).is_empty());
    }
}
