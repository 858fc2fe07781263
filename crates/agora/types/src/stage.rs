//! Stage clock and threshold rule.
//!
//! Neither the stage nor the vote status of a proposal is ever stored; both
//! are recomputed from the proposal, the current settings, and the clock.

use serde::{Deserialize, Serialize};

use crate::proposal::Proposal;
use crate::settings::Settings;
use crate::{Timestamp, Weight};

/// Derived phase of a proposal's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Yes and No votes accepted.
    Voting,
    /// Only No votes accepted.
    Veto,
    /// Windows elapsed and the proposal passed; anyone may execute it.
    Execution,
    /// Windows elapsed and the proposal failed.
    Expired,
}

impl Stage {
    /// Live proposals still count against a voter's Yes-vote cap.
    pub fn is_live(&self) -> bool {
        !matches!(self, Stage::Expired)
    }
}

/// Live classification of the threshold rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteStatus {
    Passing,
    Failing,
    Passed,
    Failed,
}

impl VoteStatus {
    pub fn is_passing(&self) -> bool {
        matches!(self, VoteStatus::Passing | VoteStatus::Passed)
    }
}

/// The pass/fail rule: enough Yes weight, and Yes strictly more than twice No.
pub fn is_passing(yes_weight: Weight, no_weight: Weight, min_yes_weight: Weight) -> bool {
    yes_weight >= min_yes_weight && yes_weight > no_weight.saturating_mul(2)
}

/// Map a creation time, settings, and the current time to a stage.
///
/// `passing` only matters once both windows have elapsed.
pub fn stage_at(create_time: Timestamp, settings: &Settings, now: Timestamp, passing: bool) -> Stage {
    if now < settings.vote_end(create_time) {
        Stage::Voting
    } else if now < settings.veto_end(create_time) {
        Stage::Veto
    } else if passing {
        Stage::Execution
    } else {
        Stage::Expired
    }
}

impl Proposal {
    pub fn is_passing(&self, settings: &Settings) -> bool {
        is_passing(self.yes_weight, self.no_weight, settings.min_yes_weight)
    }

    pub fn stage(&self, settings: &Settings, now: Timestamp) -> Stage {
        stage_at(self.create_time, settings, now, self.is_passing(settings))
    }

    pub fn vote_status(&self, settings: &Settings, now: Timestamp) -> VoteStatus {
        let decided = now >= settings.veto_end(self.create_time);
        match (self.is_passing(settings), decided) {
            (true, false) => VoteStatus::Passing,
            (false, false) => VoteStatus::Failing,
            (true, true) => VoteStatus::Passed,
            (false, true) => VoteStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::ProposalId;
    use proptest::prelude::*;

    fn settings(min_yes_weight: Weight) -> Settings {
        Settings {
            vote_period: 86_400,
            veto_period: 518_400,
            min_yes_weight,
            ..Settings::default()
        }
    }

    #[test]
    fn threshold_boundary_is_strict() {
        assert!(!is_passing(8, 5, 5));
        assert!(!is_passing(8, 4, 5));
        assert!(is_passing(13, 5, 5));
        assert!(is_passing(9, 4, 5));
    }

    #[test]
    fn minimum_weight_floor_applies_regardless_of_ratio() {
        assert!(!is_passing(4, 0, 5));
        assert!(is_passing(5, 0, 5));
    }

    #[test]
    fn zero_votes_never_pass_a_positive_floor() {
        assert!(!is_passing(0, 0, 1));
    }

    #[test]
    fn stage_windows() {
        let s = settings(5);
        let t0 = 1_000;
        assert_eq!(stage_at(t0, &s, t0, false), Stage::Voting);
        assert_eq!(stage_at(t0, &s, t0 + 86_399, false), Stage::Voting);
        assert_eq!(stage_at(t0, &s, t0 + 86_400, false), Stage::Veto);
        assert_eq!(stage_at(t0, &s, t0 + 604_799, true), Stage::Veto);
        assert_eq!(stage_at(t0, &s, t0 + 604_800, true), Stage::Execution);
        assert_eq!(stage_at(t0, &s, t0 + 604_800, false), Stage::Expired);
    }

    #[test]
    fn clock_before_creation_reads_as_voting() {
        assert_eq!(stage_at(1_000, &settings(1), 10, false), Stage::Voting);
    }

    #[test]
    fn vote_status_switches_to_final_after_veto() {
        let s = settings(5);
        let mut p = Proposal::new(ProposalId::from_bytes([7; 32]), 1_000);
        p.yes_weight = 8;
        p.no_weight = 5;
        assert_eq!(p.vote_status(&s, 1_000 + 90_000), VoteStatus::Failing);
        assert_eq!(p.vote_status(&s, 1_000 + 700_000), VoteStatus::Failed);
        assert_eq!(p.stage(&s, 1_000 + 700_000), Stage::Expired);

        p.yes_weight = 13;
        assert_eq!(p.vote_status(&s, 1_000 + 90_000), VoteStatus::Passing);
        assert_eq!(p.vote_status(&s, 1_000 + 700_000), VoteStatus::Passed);
        assert_eq!(p.stage(&s, 1_000 + 700_000), Stage::Execution);
    }

    #[test]
    fn only_expired_is_not_live() {
        assert!(Stage::Voting.is_live());
        assert!(Stage::Veto.is_live());
        assert!(Stage::Execution.is_live());
        assert!(!Stage::Expired.is_live());
    }

    proptest! {
        #[test]
        fn stage_only_moves_forward(
            create_time in 0u64..1_000_000,
            vote_period in 1u64..100_000,
            veto_period in 0u64..100_000,
            passing in any::<bool>(),
            mut times in proptest::collection::vec(0u64..2_000_000, 1..32),
        ) {
            let s = Settings { vote_period, veto_period, ..Settings::default() };
            times.sort_unstable();
            let stages: Vec<Stage> = times
                .iter()
                .map(|now| stage_at(create_time, &s, *now, passing))
                .collect();
            for pair in stages.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }

        #[test]
        fn passing_requires_floor_and_strict_ratio(yes in 0u64..1_000, no in 0u64..1_000, min in 0u64..1_000) {
            let passing = is_passing(yes, no, min);
            prop_assert_eq!(passing, yes >= min && yes > 2 * no);
        }
    }
}
