//! Builder for [`GovernanceEngine`].
//!
//! Weight oracles and call targets are injected here. The oracle named by the
//! initial settings, and every oracle governance may later switch to, must be
//! registered before the engine is built.

use std::sync::Arc;

use agora_types::{Address, GovernanceError};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ConfigResult, EngineConfig};
use crate::engine::GovernanceEngine;
use crate::oracle::{OracleRegistry, WeightOracle};
use crate::target::{CallTarget, TargetRegistry};

/// Builder for constructing a [`GovernanceEngine`] with its collaborators.
pub struct GovernanceEngineBuilder {
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    oracles: OracleRegistry,
    targets: TargetRegistry,
}

impl GovernanceEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: None,
            oracles: OracleRegistry::new(),
            targets: TargetRegistry::new(),
        }
    }

    /// Set the time source (defaults to [`SystemClock`]).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register a weight oracle at `address`.
    pub fn with_weight_oracle(mut self, address: Address, oracle: Arc<dyn WeightOracle>) -> Self {
        self.oracles.register(address, oracle);
        self
    }

    /// Register a call target at `address`.
    pub fn with_target(mut self, address: Address, target: Arc<dyn CallTarget>) -> Self {
        self.targets.register(address, target);
        self
    }

    pub fn build(self) -> ConfigResult<GovernanceEngine> {
        self.config.validate()?;

        let oracle = self.config.settings.weight_oracle;
        if !self.oracles.contains(&oracle) {
            return Err(GovernanceError::UnknownWeightOracle(oracle).into());
        }
        if self.targets.contains(&self.config.address) {
            return Err(ConfigError::Invalid(format!(
                "engine address {} is reserved for governance calls",
                self.config.address
            )));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        Ok(GovernanceEngine::from_parts(
            self.config,
            clock,
            self.oracles,
            self.targets,
        ))
    }
}
