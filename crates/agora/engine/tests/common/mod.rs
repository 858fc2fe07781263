//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use agora_engine::{
    EchoTarget, EngineConfig, ExecutionBudget, GasBurnerTarget, GovernanceEngine, ManualClock,
    RevertingTarget, StaticWeightOracle,
};
use agora_types::{Address, Timestamp};

pub const T0: Timestamp = 1_700_000_000;
pub const VOTE_PERIOD: u64 = 86_400;
pub const VETO_PERIOD: u64 = 518_400;
pub const DECIDED: u64 = VOTE_PERIOD + VETO_PERIOD;

pub fn alice() -> Address {
    Address::derive(b"alice")
}

pub fn bob() -> Address {
    Address::derive(b"bob")
}

pub fn echo() -> Address {
    Address::derive(b"target/echo")
}

pub fn paused() -> Address {
    Address::derive(b"target/paused")
}

pub fn burner() -> Address {
    Address::derive(b"target/burner")
}

pub fn backup_oracle() -> Address {
    Address::derive(b"oracle/backup")
}

pub fn ample() -> ExecutionBudget {
    ExecutionBudget::new(10_000_000)
}

pub struct Harness {
    pub engine: GovernanceEngine,
    pub clock: Arc<ManualClock>,
    pub oracle: Arc<StaticWeightOracle>,
    pub backup: Arc<StaticWeightOracle>,
}

impl Harness {
    pub fn at(&self, offset: u64) {
        self.clock.set(T0 + offset);
    }
}

/// Engine with the default periods, a Yes floor of 5, Alice weighing 8 and
/// Bob weighing 5.
pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub fn harness_with(mut config: EngineConfig) -> Harness {
    config.settings.min_yes_weight = 5;
    let clock = Arc::new(ManualClock::new(T0));
    let oracle = Arc::new(StaticWeightOracle::with_weights([(alice(), 8), (bob(), 5)]));
    let backup = Arc::new(StaticWeightOracle::with_weights([(alice(), 1), (bob(), 50)]));
    let engine = GovernanceEngine::builder(config.clone())
        .with_clock(clock.clone())
        .with_weight_oracle(config.settings.weight_oracle, oracle.clone())
        .with_weight_oracle(backup_oracle(), backup.clone())
        .with_target(echo(), Arc::new(EchoTarget::default()))
        .with_target(paused(), Arc::new(RevertingTarget::new("paused")))
        .with_target(burner(), Arc::new(GasBurnerTarget { burn: 100_000 }))
        .build()
        .expect("engine builds");
    Harness {
        engine,
        clock,
        oracle,
        backup,
    }
}
