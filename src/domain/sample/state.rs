//! Sample lifecycle states and the transition guard table.
//!
//! Every legal transition is described by the guards attached to its
//! *target* state. The table is an exhaustive `match`, so adding a state
//! without deciding its entry rules is a compile error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle state of a laboratory sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleState {
    Received,
    InAnalysis,
    PendingResults,
    Finalized,
    Rejected,
    InQuotation,
    Accepted,
}

impl SampleState {
    pub const ALL: [SampleState; 7] = [
        SampleState::Received,
        SampleState::InAnalysis,
        SampleState::PendingResults,
        SampleState::Finalized,
        SampleState::Rejected,
        SampleState::InQuotation,
        SampleState::Accepted,
    ];

    /// Preconditions for entering this state, or `None` if the state can
    /// never be targeted by a transition request.
    pub fn entry_guards(self) -> Option<&'static [Guard]> {
        use SampleState::*;
        const RECEIVED: &[Guard] = &[Guard::CurrentIn(&[Accepted, PendingResults])];
        const IN_ANALYSIS: &[Guard] = &[Guard::CurrentIn(&[Received])];
        // Results are checked first so a missing report is the reason
        // surfaced to laboratory staff.
        const FINALIZED: &[Guard] = &[Guard::HasResults, Guard::CurrentIn(&[InAnalysis])];
        const IN_QUOTATION: &[Guard] = &[Guard::HasSelectedAnalyses];
        const ACCEPTED: &[Guard] = &[Guard::CurrentIn(&[InQuotation])];
        const REJECTED: &[Guard] = &[Guard::ObservationsRequired];

        match self {
            Received => Some(RECEIVED),
            InAnalysis => Some(IN_ANALYSIS),
            Finalized => Some(FINALIZED),
            InQuotation => Some(IN_QUOTATION),
            Accepted => Some(ACCEPTED),
            Rejected => Some(REJECTED),
            PendingResults => None,
        }
    }

    /// Whether entering this state needs the result store to be consulted.
    pub fn requires_results(self) -> bool {
        self.entry_guards()
            .map(|guards| guards.contains(&Guard::HasResults))
            .unwrap_or(false)
    }

    /// Whether a client should act on reaching this state.
    pub fn requires_action(self) -> bool {
        matches!(
            self,
            SampleState::Finalized | SampleState::Rejected | SampleState::InQuotation
        )
    }

    /// Stable wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SampleState::Received => "received",
            SampleState::InAnalysis => "in_analysis",
            SampleState::PendingResults => "pending_results",
            SampleState::Finalized => "finalized",
            SampleState::Rejected => "rejected",
            SampleState::InQuotation => "in_quotation",
            SampleState::Accepted => "accepted",
        }
    }

    /// Human-readable label used in notifications and history.
    pub fn label(self) -> &'static str {
        match self {
            SampleState::Received => "Received",
            SampleState::InAnalysis => "In analysis",
            SampleState::PendingResults => "Pending results",
            SampleState::Finalized => "Finalized",
            SampleState::Rejected => "Rejected",
            SampleState::InQuotation => "In quotation",
            SampleState::Accepted => "Accepted",
        }
    }
}

impl fmt::Display for SampleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for SampleState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SampleState::ALL
            .into_iter()
            .find(|state| state.as_str() == wanted)
            .ok_or_else(|| {
                ValidationError::invalid_format("state", format!("unknown state '{}'", wanted))
            })
    }
}

/// A single entry precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The sample's current state must be one of these.
    CurrentIn(&'static [SampleState]),
    /// At least one analysis result must be recorded.
    HasResults,
    /// At least one analysis must be selected on the sample.
    HasSelectedAnalyses,
    /// The request must carry non-empty observations.
    ObservationsRequired,
}

/// Facts a guard is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub current: SampleState,
    /// `None` when results were not looked up because no guard needed them.
    pub has_results: Option<bool>,
    pub selected_analyses: usize,
    pub observations: Option<&'a str>,
}

/// Why a guard refused a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmetCondition {
    NotInState {
        required: &'static [SampleState],
        actual: SampleState,
    },
    NoResults,
    NoSelectedAnalyses,
    MissingObservations,
}

impl fmt::Display for UnmetCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmetCondition::NotInState { required, actual } => {
                let required: Vec<&str> = required.iter().map(|s| s.label()).collect();
                write!(
                    f,
                    "sample must be in state {} but is {}",
                    required.join(" or "),
                    actual.label()
                )
            }
            UnmetCondition::NoResults => {
                write!(f, "sample has no recorded results; load results before finalizing")
            }
            UnmetCondition::NoSelectedAnalyses => {
                write!(f, "sample has no selected analyses to quote")
            }
            UnmetCondition::MissingObservations => {
                write!(f, "observations are required to reject a sample")
            }
        }
    }
}

impl Guard {
    pub fn check(&self, ctx: &GuardContext<'_>) -> Result<(), UnmetCondition> {
        match self {
            Guard::CurrentIn(required) => {
                if required.contains(&ctx.current) {
                    Ok(())
                } else {
                    Err(UnmetCondition::NotInState {
                        required: *required,
                        actual: ctx.current,
                    })
                }
            }
            Guard::HasResults => match ctx.has_results {
                Some(true) => Ok(()),
                _ => Err(UnmetCondition::NoResults),
            },
            Guard::HasSelectedAnalyses => {
                if ctx.selected_analyses > 0 {
                    Ok(())
                } else {
                    Err(UnmetCondition::NoSelectedAnalyses)
                }
            }
            Guard::ObservationsRequired => match ctx.observations {
                Some(text) if !text.trim().is_empty() => Ok(()),
                _ => Err(UnmetCondition::MissingObservations),
            },
        }
    }
}

/// Structural view of the table: only the `CurrentIn` guards are considered.
impl StateMachine for SampleState {
    fn can_transition_to(&self, target: &Self) -> bool {
        match target.entry_guards() {
            None => false,
            Some(guards) => guards.iter().all(|guard| match guard {
                Guard::CurrentIn(required) => required.contains(self),
                _ => true,
            }),
        }
    }

    fn valid_transitions(&self) -> Vec<Self> {
        SampleState::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(target))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx(current: SampleState) -> GuardContext<'static> {
        GuardContext {
            current,
            has_results: Some(true),
            selected_analyses: 1,
            observations: Some("ok"),
        }
    }

    fn any_state() -> impl Strategy<Value = SampleState> {
        prop::sample::select(SampleState::ALL.to_vec())
    }

    /// Expected outcome with every fact satisfied. Rows are the current
    /// state and columns the target, both in `SampleState::ALL` order.
    const ALLOWED: [[bool; 7]; 7] = [
        // Rec, InAnalysis, Pending, Finalized, Rejected, InQuotation, Accepted
        [false, true, false, false, true, true, false], // Received
        [false, false, false, true, true, true, false], // InAnalysis
        [true, false, false, false, true, true, false], // PendingResults
        [false, false, false, false, true, true, false], // Finalized
        [false, false, false, false, true, true, false], // Rejected
        [false, false, false, false, true, true, true], // InQuotation
        [true, false, false, false, true, true, false], // Accepted
    ];

    #[test]
    fn guard_table_matches_expected_matrix() {
        for (row, current) in SampleState::ALL.into_iter().enumerate() {
            for (col, target) in SampleState::ALL.into_iter().enumerate() {
                let passes = target
                    .entry_guards()
                    .map(|guards| guards.iter().all(|g| g.check(&ctx(current)).is_ok()))
                    .unwrap_or(false);
                assert_eq!(
                    passes, ALLOWED[row][col],
                    "{:?} -> {:?}",
                    current, target
                );
                assert_eq!(current.can_transition_to(&target), ALLOWED[row][col]);
            }
        }
    }

    #[test]
    fn pending_results_cannot_be_targeted() {
        assert!(SampleState::PendingResults.entry_guards().is_none());
        for state in SampleState::ALL {
            assert!(!state.can_transition_to(&SampleState::PendingResults));
        }
    }

    #[test]
    fn only_finalized_requires_results() {
        let needing: Vec<_> = SampleState::ALL
            .into_iter()
            .filter(|s| s.requires_results())
            .collect();
        assert_eq!(needing, vec![SampleState::Finalized]);
    }

    #[test]
    fn received_reentry_allowed_from_accepted_and_pending_results() {
        assert!(SampleState::Accepted.can_transition_to(&SampleState::Received));
        assert!(SampleState::PendingResults.can_transition_to(&SampleState::Received));
        assert!(!SampleState::InAnalysis.can_transition_to(&SampleState::Received));
    }

    #[test]
    fn structural_targets_from_received() {
        assert_eq!(
            SampleState::Received.valid_transitions(),
            vec![
                SampleState::InAnalysis,
                SampleState::Rejected,
                SampleState::InQuotation,
            ]
        );
    }

    #[test]
    fn finalize_without_results_reports_results_first() {
        let guards = SampleState::Finalized.entry_guards().unwrap();
        let context = GuardContext {
            has_results: Some(false),
            ..ctx(SampleState::Received)
        };
        let first_failure = guards.iter().find_map(|g| g.check(&context).err());
        assert_eq!(first_failure, Some(UnmetCondition::NoResults));
    }

    #[test]
    fn results_guard_fails_when_not_looked_up() {
        let context = GuardContext {
            has_results: None,
            ..ctx(SampleState::InAnalysis)
        };
        assert_eq!(
            Guard::HasResults.check(&context),
            Err(UnmetCondition::NoResults)
        );
    }

    #[test]
    fn whitespace_observations_do_not_satisfy_rejection() {
        let context = GuardContext {
            observations: Some("   "),
            ..ctx(SampleState::InAnalysis)
        };
        assert_eq!(
            Guard::ObservationsRequired.check(&context),
            Err(UnmetCondition::MissingObservations)
        );
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("in_quotation".parse::<SampleState>().unwrap(), SampleState::InQuotation);
        assert!("InQuotation".parse::<SampleState>().is_err());
        assert!("".parse::<SampleState>().is_err());
    }

    #[test]
    fn serde_and_as_str_agree() {
        for state in SampleState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }

    #[test]
    fn requires_action_states() {
        assert!(SampleState::Finalized.requires_action());
        assert!(SampleState::Rejected.requires_action());
        assert!(SampleState::InQuotation.requires_action());
        assert!(!SampleState::InAnalysis.requires_action());
    }

    proptest! {
        #[test]
        fn guards_pass_with_all_facts_iff_structurally_allowed(
            current in any_state(),
            target in any_state(),
        ) {
            let allowed = match target.entry_guards() {
                None => false,
                Some(guards) => guards.iter().all(|g| g.check(&ctx(current)).is_ok()),
            };
            prop_assert_eq!(allowed, current.can_transition_to(&target));
        }

        #[test]
        fn finalized_only_reachable_from_in_analysis(current in any_state()) {
            prop_assert_eq!(
                current.can_transition_to(&SampleState::Finalized),
                current == SampleState::InAnalysis
            );
        }
    }
}
