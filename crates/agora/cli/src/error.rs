//! CLI error types

use agora_engine::ConfigError;
use agora_types::HexError;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Engine configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scenario file is malformed or refers to unknown names
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed hex address, id, or payload
    #[error("Hex error: {0}")]
    Hex(#[from] HexError),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
