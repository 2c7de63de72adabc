//! State machine trait for lifecycle enums.
//!
//! Captures the *structural* part of a lifecycle: which target states are
//! reachable from which current states. Preconditions that need data outside
//! the enum (results, selected analyses, observations) live with the aggregate.

use super::ValidationError;

/// Trait for closed enums that represent a state machine.
///
/// ```ignore
/// let next = SampleState::Received.transition_to(SampleState::InAnalysis)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from self to target is structurally allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all structurally reachable targets from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition, returning an error if it is not allowed.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// True when no outgoing transition exists.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
