//! Mutations are serialized; queries read the last committed state.

mod common;

use std::sync::Arc;
use std::time::Duration;

use agora_engine::{
    CallFailure, CallRequest, CallTarget, EngineConfig, GasMeter, GovernanceEngine, ManualClock,
    StaticWeightOracle,
};
use agora_types::{
    Address, ExecutionStatus, GovernanceError, GovernanceEvent, Message, ProposalId, VoteType,
};
use async_trait::async_trait;
use common::*;
use tokio::sync::Notify;
use tokio::task::JoinSet;

fn numbered(n: u8) -> Message {
    Message::new(echo(), vec![n], Vec::new())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_yes_votes_respect_the_live_cap() {
    let h = Arc::new(harness());
    let limit = h.engine.settings().await.max_live_yes_votes;

    let mut votes = JoinSet::new();
    for n in 1..=12 {
        let h = h.clone();
        votes.spawn(async move {
            h.engine
                .vote(alice(), numbered(n).id(), VoteType::Yes, b"")
                .await
        });
    }

    let mut accepted = 0;
    while let Some(result) = votes.join_next().await {
        match result.unwrap() {
            Ok(()) => accepted += 1,
            Err(err) => assert_eq!(
                err,
                GovernanceError::MaxLiveYesVotesExceeded {
                    voter: alice(),
                    limit
                }
            ),
        }
    }
    assert_eq!(accepted, limit as usize);
    assert_eq!(h.engine.live_yes_votes(&alice()).await, limit as usize);

    let created = h
        .engine
        .event_history()
        .iter()
        .filter(|r| matches!(r.event, GovernanceEvent::ProposalCreated { .. }))
        .count();
    assert_eq!(created, limit as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_executes_run_the_proposal_once() {
    let h = Arc::new(harness());
    let message = numbered(1);
    h.engine
        .vote(alice(), message.id(), VoteType::Yes, b"")
        .await
        .unwrap();
    h.at(DECIDED);

    let mut runs = JoinSet::new();
    for _ in 0..2 {
        let h = h.clone();
        let message = message.clone();
        runs.spawn(async move { h.engine.execute(&message, ample()).await });
    }

    let mut receipts = Vec::new();
    let mut errors = Vec::new();
    while let Some(result) = runs.join_next().await {
        match result.unwrap() {
            Ok(receipt) => receipts.push(receipt),
            Err(err) => errors.push(err),
        }
    }
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].status, ExecutionStatus::Executed);
    assert_eq!(errors, vec![GovernanceError::ProposalNotFound(message.id())]);

    let executed = h
        .engine
        .event_history()
        .iter()
        .filter(|r| matches!(r.event, GovernanceEvent::Executed { .. }))
        .count();
    assert_eq!(executed, 1);
}

/// Parks inside the call until released.
struct GatedTarget {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl CallTarget for GatedTarget {
    async fn call(&self, _request: &CallRequest, _gas: &GasMeter) -> Result<Vec<u8>, CallFailure> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(b"done".to_vec())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queries_do_not_wait_on_a_running_execute() {
    let config = EngineConfig::default();
    let clock = Arc::new(ManualClock::new(T0));
    let gated = Address::derive(b"target/gated");
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let engine = Arc::new(
        GovernanceEngine::builder(config.clone())
            .with_clock(clock.clone())
            .with_weight_oracle(
                config.settings.weight_oracle,
                Arc::new(StaticWeightOracle::with_weights([(alice(), 8)])),
            )
            .with_target(
                gated,
                Arc::new(GatedTarget {
                    entered: entered.clone(),
                    release: release.clone(),
                }),
            )
            .build()
            .unwrap(),
    );

    let message = Message::new(gated, Vec::new(), Vec::new());
    let other = ProposalId::from_bytes([3; 32]);
    engine.propose(other).await.unwrap();
    engine
        .vote(alice(), message.id(), VoteType::Yes, b"")
        .await
        .unwrap();
    clock.set(T0 + DECIDED);

    let running = {
        let engine = engine.clone();
        let message = message.clone();
        tokio::spawn(async move { engine.execute(&message, ample()).await })
    };
    entered.notified().await;

    let quick = Duration::from_secs(1);
    let unrelated = tokio::time::timeout(quick, engine.get_proposal(&other))
        .await
        .expect("query on another proposal waited for execute");
    assert_eq!(unrelated.create_time, T0);
    // Until the execute commits, the proposal is still visible as passed.
    let executing = tokio::time::timeout(quick, engine.is_live(&message.id()))
        .await
        .expect("query on the executing proposal waited for execute");
    assert!(executing);

    release.notify_one();
    let receipt = running.await.unwrap().unwrap();
    assert_eq!(receipt.return_value, b"done");
    assert!(!engine.proposal_exists(&message.id()).await);
    assert!(engine.proposal_exists(&other).await);
}
