//! Agora CLI - tools around the weighted governance engine
//!
//! This CLI lets operators and integrators:
//! - Compute content-addressed proposal ids
//! - Encode governance calls as proposal payloads
//! - Run scripted scenarios against an in-memory engine

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use agora_engine::EngineConfig;
use agora_types::{Address, GovernanceCall, Message, ProposalId};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
pub mod scenario;

pub use error::{CliError, CliResult};

/// Agora CLI application
#[derive(Parser)]
#[command(name = "agora")]
#[command(about = "Agora - weighted governance engine tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Compute the id of a proposal
    Id {
        /// Target address (0x-prefixed hex, or a label to derive one from)
        #[arg(long)]
        target: String,

        /// Call payload (0x-prefixed hex, or UTF-8 text)
        #[arg(long, default_value = "")]
        payload: String,

        /// Free-form memo text
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Encode a governance call (JSON) as a payload addressed to the engine
    EncodeCall {
        /// e.g. '{"call":"set_min_weight","min_yes_weight":5}'
        json: String,

        /// Free-form memo text
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Run a scripted scenario against an in-memory engine
    Simulate {
        /// Scenario file (TOML)
        scenario: PathBuf,
    },

    /// Show the effective engine configuration
    Config,
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Logs go to stderr so stdout stays machine-readable.
    let filter = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();

    let config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Id {
            target,
            payload,
            memo,
        } => {
            let target = parse_address(&target)?;
            let payload = parse_bytes(&payload)?;
            writeln!(out, "{}", ProposalId::derive(&target, &payload, memo.as_bytes()))?;
        }
        Commands::EncodeCall { json, memo } => {
            let call: GovernanceCall = serde_json::from_str(&json)?;
            let message = call.into_message(config.address, memo.into_bytes());
            let line = serde_json::json!({
                "target": message.target,
                "payload": format!("0x{}", hex::encode(&message.payload)),
                "id": message.id(),
            });
            writeln!(out, "{line}")?;
        }
        Commands::Simulate { scenario } => {
            let scenario = scenario::Scenario::load(&scenario)?;
            let report = scenario::run(&scenario, config, &mut out).await?;
            tracing::info!(
                steps = report.steps,
                rejected = report.rejected,
                events = report.events,
                "scenario finished"
            );
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| CliError::InvalidInput(e.to_string()))?;
            write!(out, "{rendered}")?;
        }
    }
    Ok(())
}

/// Parse an address: `0x`-prefixed hex, or a label to derive one from.
pub fn parse_address(input: &str) -> CliResult<Address> {
    if input.starts_with("0x") {
        Ok(Address::from_hex(input)?)
    } else if input.is_empty() {
        Err(CliError::InvalidInput("empty address".into()))
    } else {
        Ok(Address::derive(input.as_bytes()))
    }
}

/// Parse bytes: `0x`-prefixed hex, or UTF-8 text taken verbatim.
pub fn parse_bytes(input: &str) -> CliResult<Vec<u8>> {
    match input.strip_prefix("0x") {
        Some(digits) => {
            hex::decode(digits).map_err(|e| CliError::InvalidInput(format!("bad hex {input}: {e}")))
        }
        None => Ok(input.as_bytes().to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_parse_from_hex_or_label() {
        let hex = "0x2222222222222222222222222222222222222222";
        assert_eq!(parse_address(hex).unwrap(), Address::from_bytes([0x22; 20]));
        assert_eq!(parse_address("treasury").unwrap(), Address::derive(b"treasury"));
        assert!(parse_address("0x12").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn bytes_parse_from_hex_or_text() {
        assert_eq!(parse_bytes("0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(parse_bytes("hello").unwrap(), b"hello".to_vec());
        assert_eq!(parse_bytes("").unwrap(), Vec::<u8>::new());
        assert!(parse_bytes("0xzz").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
