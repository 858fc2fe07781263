//! Engine configuration.
//!
//! Loaded from TOML. Every field has a default, so a partial file (or none
//! at all) yields a usable engine.

use std::path::Path;
use std::time::Duration;

use agora_types::{Address, GovernanceError, Settings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Governance(#[from] GovernanceError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The engine's own address. Proposals targeting it carry governance calls.
    pub address: Address,

    /// Wall-clock bound on a single target call, in milliseconds.
    pub call_timeout_ms: u64,

    /// Number of past events retained for `event_history`.
    pub event_history: usize,

    /// Initial governance settings.
    pub settings: Settings,

    /// Gas accounting for `execute`.
    pub gas: GasConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            address: Address::derive(b"agora/engine"),
            call_timeout_ms: 30_000,
            event_history: 1024,
            settings: Settings::default(),
            gas: GasConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.settings.validate()?;
        self.gas.validate()?;
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "call_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Gas accounting for the external call made by `execute`.
///
/// The engine keeps `bookkeeping_reserve` for its own post-call work and
/// forwards at most `max_call_gas` of the remainder to the target. A budget
/// that cannot cover the reserve plus `min_call_gas` is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    pub bookkeeping_reserve: u64,
    pub min_call_gas: u64,
    pub max_call_gas: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            bookkeeping_reserve: 50_000,
            min_call_gas: 21_000,
            max_call_gas: 5_000_000,
        }
    }
}

impl GasConfig {
    /// Smallest budget `execute` accepts at all.
    pub fn minimum_budget(&self) -> u64 {
        self.bookkeeping_reserve.saturating_add(self.min_call_gas)
    }

    /// Budget needed to forward the full `max_call_gas`.
    pub fn full_budget(&self) -> u64 {
        self.bookkeeping_reserve.saturating_add(self.max_call_gas)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_call_gas == 0 {
            return Err(ConfigError::Invalid(
                "gas.max_call_gas must be greater than zero".into(),
            ));
        }
        if self.min_call_gas > self.max_call_gas {
            return Err(ConfigError::Invalid(format!(
                "gas.min_call_gas ({}) exceeds gas.max_call_gas ({})",
                self.min_call_gas, self.max_call_gas
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settings.max_live_yes_votes, 4);
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = EngineConfig::load("/nonexistent/agora/config.toml").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
call_timeout_ms = 500

[settings]
vote_period = 60
min_yes_weight = 5

[gas]
max_call_gas = 100000
"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.call_timeout_ms, 500);
        assert_eq!(config.settings.vote_period, 60);
        assert_eq!(config.settings.min_yes_weight, 5);
        assert_eq!(config.settings.veto_period, 518_400);
        assert_eq!(config.gas.max_call_gas, 100_000);
        assert_eq!(config.gas.bookkeeping_reserve, 50_000);
    }

    #[test]
    fn addresses_parse_from_hex() {
        let config = EngineConfig::from_toml_str(
            r#"address = "0x1111111111111111111111111111111111111111""#,
        )
        .unwrap();
        assert_eq!(config.address, Address::from_bytes([0x11; 20]));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = EngineConfig::from_toml_str("[settings]\nvote_period = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Governance(GovernanceError::InvalidSettings(_))
        ));
    }

    #[test]
    fn inverted_gas_bounds_are_rejected() {
        let err = EngineConfig::from_toml_str("[gas]\nmin_call_gas = 10\nmax_call_gas = 5\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("address = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn gas_budgets() {
        let gas = GasConfig::default();
        assert_eq!(gas.minimum_budget(), 71_000);
        assert_eq!(gas.full_budget(), 5_050_000);
    }
}
