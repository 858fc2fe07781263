//! Scripted scenarios.
//!
//! A scenario declares voter weights, call targets, and named proposals, then
//! drives an in-memory engine through timed steps on a manual clock. Every
//! step and every committed event is written as one JSON line.
//!
//! ```toml
//! start = 1700000000
//!
//! [settings]
//! min_yes_weight = 5
//!
//! [weights]
//! alice = 8
//! bob = 5
//!
//! [[targets]]
//! name = "treasury"
//! kind = "echo"
//!
//! [[proposals]]
//! name = "grant"
//! target = "treasury"
//! payload = "pay 10"
//!
//! [[steps]]
//! action = "vote"
//! voter = "alice"
//! proposal = "grant"
//! vote = "yes"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use agora_engine::{
    CallTarget, EchoTarget, EngineConfig, ExecutionBudget, ExecutionReceipt,
    GasBurnerTarget, GovernanceEngine, ManualClock, RevertingTarget, StaticWeightOracle,
};
use agora_types::{
    Address, GovernanceCall, Message, Settings, Timestamp, VoteType, Weight,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;

use crate::{parse_address, parse_bytes, CliError, CliResult};

/// Name that resolves to the engine's own address.
pub const ENGINE_NAME: &str = "engine";

fn default_start() -> Timestamp {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Initial clock reading; must be nonzero.
    #[serde(default = "default_start")]
    pub start: Timestamp,

    /// Overrides the configured settings.
    #[serde(default)]
    pub settings: Option<Settings>,

    /// Voter weights, by label or hex address.
    #[serde(default)]
    pub weights: BTreeMap<String, Weight>,

    #[serde(default)]
    pub targets: Vec<TargetSpec>,

    #[serde(default)]
    pub proposals: Vec<ProposalSpec>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Echo,
    Revert,
    Burner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub kind: TargetKind,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub gas_per_byte: Option<u64>,
    #[serde(default)]
    pub burn: Option<u64>,
}

impl TargetSpec {
    fn build(&self) -> Arc<dyn CallTarget> {
        match self.kind {
            TargetKind::Echo => Arc::new(EchoTarget {
                gas_per_byte: self
                    .gas_per_byte
                    .unwrap_or(EchoTarget::default().gas_per_byte),
            }),
            TargetKind::Revert => Arc::new(RevertingTarget::new(
                self.reason.clone().unwrap_or_else(|| "reverted".into()),
            )),
            TargetKind::Burner => Arc::new(GasBurnerTarget {
                burn: self.burn.unwrap_or(0),
            }),
        }
    }
}

/// A named proposal: either an external call (`target` + `payload`), a
/// governance `call`, or the cancellation of another named proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalSpec {
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub call: Option<GovernanceCall>,
    #[serde(default)]
    pub cancel: Option<String>,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Propose {
        proposal: String,
    },
    Vote {
        voter: String,
        proposal: String,
        vote: String,
        #[serde(default)]
        memo: String,
    },
    Execute {
        proposal: String,
        #[serde(default)]
        gas: Option<u64>,
    },
    Advance {
        seconds: u64,
    },
    SetWeight {
        account: String,
        weight: Weight,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Propose { .. } => "propose",
            Step::Vote { .. } => "vote",
            Step::Execute { .. } => "execute",
            Step::Advance { .. } => "advance",
            Step::SetWeight { .. } => "set_weight",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> CliResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> CliResult<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub steps: usize,
    pub rejected: usize,
    pub events: usize,
}

#[derive(Serialize)]
struct StepLine<'a> {
    step: usize,
    at: Timestamp,
    action: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<ExecutionReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

struct Resolver {
    engine: Address,
    messages: HashMap<String, Message>,
}

impl Resolver {
    fn address(&self, name: &str) -> CliResult<Address> {
        if name == ENGINE_NAME {
            Ok(self.engine)
        } else {
            parse_address(name)
        }
    }

    fn message(&self, name: &str) -> CliResult<&Message> {
        self.messages
            .get(name)
            .ok_or_else(|| CliError::Scenario(format!("unknown proposal {name:?}")))
    }

    fn define(&mut self, spec: &ProposalSpec) -> CliResult<()> {
        let memo = spec.memo.clone().into_bytes();
        let message = match (&spec.call, &spec.cancel) {
            (Some(_), Some(_)) => {
                return Err(CliError::Scenario(format!(
                    "proposal {:?}: `call` and `cancel` are exclusive",
                    spec.name
                )))
            }
            (Some(call), None) => call.clone().into_message(self.engine, memo),
            (None, Some(other)) => {
                let id = self.message(other)?.id();
                GovernanceCall::CancelProposal { id }.into_message(self.engine, memo)
            }
            (None, None) => {
                let target = spec.target.as_deref().ok_or_else(|| {
                    CliError::Scenario(format!("proposal {:?} has no target", spec.name))
                })?;
                let payload = parse_bytes(spec.payload.as_deref().unwrap_or_default())?;
                Message::new(self.address(target)?, payload, memo)
            }
        };
        if self.messages.insert(spec.name.clone(), message).is_some() {
            return Err(CliError::Scenario(format!(
                "proposal {:?} defined twice",
                spec.name
            )));
        }
        Ok(())
    }
}

/// Run `scenario` against a fresh engine built from `config`.
pub async fn run<W: Write>(
    scenario: &Scenario,
    mut config: EngineConfig,
    out: &mut W,
) -> CliResult<ScenarioReport> {
    if let Some(settings) = &scenario.settings {
        config.settings = settings.clone();
    }

    let mut resolver = Resolver {
        engine: config.address,
        messages: HashMap::new(),
    };
    let mut weights = Vec::with_capacity(scenario.weights.len());
    for (account, weight) in &scenario.weights {
        weights.push((resolver.address(account)?, *weight));
    }

    let clock = Arc::new(ManualClock::new(scenario.start));
    let oracle = Arc::new(StaticWeightOracle::with_weights(weights));
    let mut builder = GovernanceEngine::builder(config.clone())
        .with_clock(clock.clone())
        .with_weight_oracle(config.settings.weight_oracle, oracle.clone());
    for target in &scenario.targets {
        builder = builder.with_target(resolver.address(&target.name)?, target.build());
    }
    let engine = builder.build()?;

    for spec in &scenario.proposals {
        resolver.define(spec)?;
    }

    let mut events = engine.subscribe();
    let mut report = ScenarioReport::default();
    for (index, step) in scenario.steps.iter().enumerate() {
        let mut line = StepLine {
            step: index + 1,
            at: 0,
            action: step.action(),
            ok: true,
            receipt: None,
            error: None,
        };

        let result = match step {
            Step::Propose { proposal } => engine.propose(resolver.message(proposal)?.id()).await,
            Step::Vote {
                voter,
                proposal,
                vote,
                memo,
            } => {
                let vtype: VoteType = vote.parse().map_err(CliError::Scenario)?;
                let id = resolver.message(proposal)?.id();
                engine
                    .vote(resolver.address(voter)?, id, vtype, memo.as_bytes())
                    .await
            }
            Step::Execute { proposal, gas } => {
                let budget = ExecutionBudget::new(gas.unwrap_or(config.gas.full_budget()));
                engine
                    .execute(resolver.message(proposal)?, budget)
                    .await
                    .map(|receipt| line.receipt = Some(receipt))
            }
            Step::Advance { seconds } => {
                clock.advance(*seconds);
                Ok(())
            }
            Step::SetWeight { account, weight } => {
                oracle.set_weight(resolver.address(account)?, *weight);
                Ok(())
            }
        };
        if let Err(err) = result {
            line.ok = false;
            line.error = Some(err.to_string());
            report.rejected += 1;
        }
        line.at = engine.now();
        writeln!(out, "{}", serde_json::to_string(&line)?)?;
        report.steps += 1;

        loop {
            match events.try_recv() {
                Ok(record) => {
                    writeln!(out, "{}", serde_json::to_string(&record)?)?;
                    report.events += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event stream lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VETO_SCENARIO: &str = r#"
start = 1000

[settings]
min_yes_weight = 5

[weights]
alice = 8
bob = 5

[[targets]]
name = "treasury"
kind = "echo"

[[proposals]]
name = "grant"
target = "treasury"
payload = "pay 10"

[[steps]]
action = "vote"
voter = "alice"
proposal = "grant"
vote = "yes"

[[steps]]
action = "advance"
seconds = 90000

[[steps]]
action = "vote"
voter = "bob"
proposal = "grant"
vote = "yes"

[[steps]]
action = "vote"
voter = "bob"
proposal = "grant"
vote = "no"

[[steps]]
action = "advance"
seconds = 610000

[[steps]]
action = "execute"
proposal = "grant"
"#;

    async fn run_lines(toml: &str) -> (ScenarioReport, Vec<serde_json::Value>) {
        let scenario = Scenario::from_toml_str(toml).unwrap();
        let mut out = Vec::new();
        let report = run(&scenario, EngineConfig::default(), &mut out)
            .await
            .unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (report, lines)
    }

    #[tokio::test]
    async fn veto_scenario_ends_unexecutable() {
        let (report, lines) = run_lines(VETO_SCENARIO).await;
        assert_eq!(report.steps, 6);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.events, 3);

        let steps: Vec<&serde_json::Value> =
            lines.iter().filter(|l| l.get("step").is_some()).collect();
        assert!(steps[2]["error"]
            .as_str()
            .unwrap()
            .contains("vote period over"));
        assert!(steps[5]["error"].as_str().unwrap().contains("has not passed"));
        assert_eq!(steps[5]["at"], 1000 + 90000 + 610000);
    }

    #[tokio::test]
    async fn omitted_start_creates_proposals_at_one() {
        let toml = r#"
[[targets]]
name = "treasury"
kind = "echo"

[[proposals]]
name = "grant"
target = "treasury"
payload = "pay 10"

[[steps]]
action = "propose"
proposal = "grant"
"#;
        let (report, lines) = run_lines(toml).await;
        assert_eq!(report.rejected, 0);
        assert_eq!(lines[0]["at"], 1);
        assert_eq!(lines[1]["event"]["kind"], "proposal_created");
        assert_eq!(lines[1]["at"], 1);
    }

    #[tokio::test]
    async fn governance_proposals_change_settings() {
        let toml = r#"
[weights]
alice = 8

[[proposals]]
name = "lower-floor"
call = { call = "set_min_weight", min_yes_weight = 3 }

[[steps]]
action = "vote"
voter = "alice"
proposal = "lower-floor"
vote = "yes"

[[steps]]
action = "advance"
seconds = 604800

[[steps]]
action = "execute"
proposal = "lower-floor"
"#;
        let (report, lines) = run_lines(toml).await;
        assert_eq!(report.rejected, 0);
        let kinds: Vec<&str> = lines
            .iter()
            .filter_map(|l| l.get("event"))
            .map(|e| e["kind"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec!["proposal_created", "voted", "settings_updated", "executed"]
        );
        let executed = lines.iter().find(|l| l["action"] == "execute").unwrap();
        assert_eq!(executed["receipt"]["status"], "Executed");
    }

    #[tokio::test]
    async fn cancel_refers_to_an_earlier_proposal() {
        let toml = r#"
[weights]
alice = 8

[[proposals]]
name = "a"
target = "treasury"

[[proposals]]
name = "kill-a"
cancel = "a"

[[steps]]
action = "vote"
voter = "alice"
proposal = "a"
vote = "yes"

[[steps]]
action = "vote"
voter = "alice"
proposal = "kill-a"
vote = "yes"

[[steps]]
action = "advance"
seconds = 604800

[[steps]]
action = "execute"
proposal = "kill-a"

[[steps]]
action = "execute"
proposal = "a"
"#;
        let (report, lines) = run_lines(toml).await;
        assert_eq!(report.rejected, 1);
        assert!(lines
            .iter()
            .any(|l| l.get("event").is_some_and(|e| e["kind"] == "proposal_canceled")));
        let last = lines.iter().rev().find(|l| l.get("step").is_some()).unwrap();
        assert!(last["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn unknown_proposal_name_is_a_scenario_error() {
        let toml = r#"
[[steps]]
action = "propose"
proposal = "missing"
"#;
        let scenario = Scenario::from_toml_str(toml).unwrap();
        let mut out = Vec::new();
        let err = run(&scenario, EngineConfig::default(), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Scenario(_)));
    }

    #[test]
    fn unknown_top_level_keys_are_rejected() {
        assert!(Scenario::from_toml_str("bogus = 1").is_err());
    }
}
