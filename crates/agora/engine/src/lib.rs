#![deny(unsafe_code)]
//! Agora governance engine.
//!
//! Accounts with externally supplied weight vote Yes or No on
//! content-addressed proposals. A proposal that clears the threshold and
//! survives its veto window can be executed by anyone, performing a single
//! gas-bounded call against a registered target. The engine's own settings
//! are changed the same way, by proposals addressed to the engine.
//!
//! ```no_run
//! use std::sync::Arc;
//! use agora_engine::{EngineConfig, GovernanceEngine, StaticWeightOracle};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let oracle = config.settings.weight_oracle;
//! let engine = GovernanceEngine::builder(config)
//!     .with_weight_oracle(oracle, Arc::new(StaticWeightOracle::new()))
//!     .build()?;
//! # let _ = engine;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod clock;
pub mod config;
pub mod engine;
pub mod event_bus;
pub mod executor;
mod governance;
pub mod oracle;
pub mod spam_guard;
pub mod state;
pub mod store;
pub mod target;

pub use builder::GovernanceEngineBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ConfigResult, EngineConfig, GasConfig};
pub use engine::{GovernanceEngine, GovernanceResult};
pub use event_bus::EventBus;
pub use executor::{ExecutionBudget, ExecutionReceipt};
pub use oracle::{OracleError, OracleRegistry, StaticWeightOracle, WeightOracle};
pub use state::{EngineSnapshot, EngineState, ProposalView};
pub use target::{
    CallFailure, CallRequest, CallTarget, EchoTarget, GasBurnerTarget, GasMeter, RevertingTarget,
    TargetRegistry,
};

pub use agora_types as types;
