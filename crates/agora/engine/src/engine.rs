//! The governance engine.
//!
//! Mutations are serialized on one lock over the working state: `propose`,
//! `vote`, and `execute` hold it for their whole duration, including the
//! oracle lookup and the external call. Each successful mutation publishes
//! the committed state on a `watch` channel, and queries read that snapshot,
//! so they never wait on a mutation in progress. Committed events are
//! published on the [`EventBus`] before the lock is released, so event order
//! matches commit order.

use std::sync::Arc;

use agora_types::{
    Address, EventRecord, GovernanceCall, GovernanceError, GovernanceEvent, Message, Proposal,
    ProposalId, Settings, Stage, Timestamp, VoteRecord, VoteStatus, VoteType,
};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::builder::GovernanceEngineBuilder;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::event_bus::EventBus;
use crate::executor::{ExecutionBudget, ExecutionReceipt, Executor};
use crate::oracle::OracleRegistry;
use crate::state::{EngineSnapshot, EngineState};
use crate::target::TargetRegistry;

/// Result type for engine operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Weighted governance engine.
pub struct GovernanceEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    oracles: OracleRegistry,
    targets: TargetRegistry,
    /// Working state; holding the lock is what serializes mutations.
    state: Mutex<EngineState>,
    /// Last committed state.
    committed: watch::Sender<Arc<EngineState>>,
    events: EventBus,
}

impl GovernanceEngine {
    pub fn builder(config: EngineConfig) -> GovernanceEngineBuilder {
        GovernanceEngineBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        oracles: OracleRegistry,
        targets: TargetRegistry,
    ) -> Self {
        let state = EngineState::new(config.settings.clone());
        let events = EventBus::new(config.event_history);
        let (committed, _) = watch::channel(Arc::new(state.clone()));
        Self {
            config,
            clock,
            oracles,
            targets,
            state: Mutex::new(state),
            committed,
            events,
        }
    }

    /// The engine's own address; proposals targeting it carry governance calls.
    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current clock reading. A reading of zero is taken as 1 so that every
    /// stored proposal has a nonzero creation time.
    pub fn now(&self) -> Timestamp {
        self.clock.now().max(1)
    }

    /// Publish `state` as the committed state, then its events.
    fn commit(&self, state: &EngineState, now: Timestamp, events: Vec<GovernanceEvent>) {
        self.committed.send_replace(Arc::new(state.clone()));
        self.events.publish(now, events);
    }

    fn committed(&self) -> Arc<EngineState> {
        self.committed.borrow().clone()
    }

    /// Create an empty proposal.
    pub async fn propose(&self, id: ProposalId) -> GovernanceResult<()> {
        let mut state = self.state.lock().await;
        let now = self.now();
        match state.propose(id, now) {
            Ok(events) => {
                info!(proposal_id = %id, create_time = now, "proposal created");
                self.commit(&state, now, events);
                Ok(())
            }
            Err(err) => {
                debug!(proposal_id = %id, error = %err, "propose rejected");
                Err(err)
            }
        }
    }

    /// Cast, change, or re-weight `voter`'s vote on `id`.
    ///
    /// The voter's weight is read from the active weight oracle at call time.
    /// Voting on an unknown id creates the proposal.
    pub async fn vote(
        &self,
        voter: Address,
        id: ProposalId,
        vtype: VoteType,
        memo: &[u8],
    ) -> GovernanceResult<()> {
        let mut state = self.state.lock().await;
        let now = self.now();
        if let Err(err) = state.admit_vote(&id, vtype, now) {
            debug!(proposal_id = %id, voter = %voter, error = %err, "vote rejected");
            return Err(err);
        }

        let oracle_address = state.settings().weight_oracle;
        let oracle = self
            .oracles
            .get(&oracle_address)
            .ok_or(GovernanceError::UnknownWeightOracle(oracle_address))?;
        let weight = oracle.weight_of(&voter).await.map_err(|e| {
            warn!(oracle = %oracle_address, voter = %voter, error = %e, "weight lookup failed");
            GovernanceError::WeightOracleUnavailable(e.to_string())
        })?;

        match state.apply_vote(id, voter, vtype, weight, memo, now) {
            Ok(events) => {
                info!(proposal_id = %id, voter = %voter, ?vtype, weight, "vote recorded");
                self.commit(&state, now, events);
                Ok(())
            }
            Err(err) => {
                debug!(proposal_id = %id, voter = %voter, error = %err, "vote rejected");
                Err(err)
            }
        }
    }

    /// Execute a passed proposal, identified by its full content.
    pub async fn execute(
        &self,
        message: &Message,
        budget: ExecutionBudget,
    ) -> GovernanceResult<ExecutionReceipt> {
        let mut state = self.state.lock().await;
        let now = self.now();
        let executor = Executor::new(
            self.config.address,
            self.config.gas,
            self.config.call_timeout(),
            &self.targets,
            &self.oracles,
        );
        let (receipt, events) = executor
            .execute(&mut state, message, budget, now)
            .await
            .inspect_err(|err| {
                debug!(proposal_id = %message.id(), error = %err, "execute rejected");
            })?;
        info!(
            proposal_id = %receipt.id,
            status = ?receipt.status,
            gas_used = receipt.gas_used,
            "proposal executed"
        );
        self.commit(&state, now, events);
        Ok(receipt)
    }

    /// Direct entry point for governance calls.
    ///
    /// Always fails: governance calls only take effect as the payload of an
    /// executed proposal addressed to [`GovernanceEngine::address`].
    pub async fn governance_call(
        &self,
        caller: Address,
        call: GovernanceCall,
    ) -> GovernanceResult<()> {
        warn!(caller = %caller, ?call, "rejected direct governance call");
        Err(GovernanceError::Unauthorized(caller))
    }

    /// The stored proposal, or [`Proposal::absent`] if there is none.
    pub async fn get_proposal(&self, id: &ProposalId) -> Proposal {
        self.committed()
            .proposal(id)
            .cloned()
            .unwrap_or_else(Proposal::absent)
    }

    pub async fn proposal_exists(&self, id: &ProposalId) -> bool {
        self.committed().proposal(id).is_some()
    }

    pub async fn get_stage(&self, id: &ProposalId) -> GovernanceResult<Stage> {
        self.committed().stage_of(id, self.now())
    }

    pub async fn get_vote_status(&self, id: &ProposalId) -> GovernanceResult<VoteStatus> {
        self.committed().vote_status_of(id, self.now())
    }

    /// Whether the proposal exists and has not expired.
    pub async fn is_live(&self, id: &ProposalId) -> bool {
        self.committed()
            .stage_of(id, self.now())
            .is_ok_and(|stage| stage.is_live())
    }

    /// The voter's record on `id`; an empty record if they have not voted.
    pub async fn get_vote(&self, id: &ProposalId, voter: &Address) -> VoteRecord {
        self.committed().vote_of(id, voter)
    }

    pub async fn settings(&self) -> Settings {
        self.committed().settings().clone()
    }

    pub async fn live_yes_votes(&self, voter: &Address) -> usize {
        self.committed().live_yes_votes(voter, self.now())
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.committed().snapshot(self.now())
    }

    /// Subscribe to committed events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Retained past events, oldest first.
    pub fn event_history(&self) -> Vec<EventRecord> {
        self.events.history()
    }
}
