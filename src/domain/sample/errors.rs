//! Sample transition error types.

use thiserror::Error;

use super::{SampleState, UnmetCondition};
use crate::domain::foundation::{DomainError, ErrorCode, SampleId};

/// Errors returned by a sample transition request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Sample not found: {0}")]
    NotFound(SampleId),

    /// The target state has no entry in the guard table.
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: SampleState, to: SampleState },

    #[error("Transition precondition failed: {0}")]
    Precondition(UnmetCondition),

    /// The sample kept changing underneath us.
    #[error("Sample {0} was modified concurrently; retry the request")]
    Conflict(SampleId),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl TransitionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TransitionError::NotFound(_) => ErrorCode::SampleNotFound,
            TransitionError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            TransitionError::Precondition(_) => ErrorCode::PreconditionFailed,
            TransitionError::Conflict(_) => ErrorCode::ConcurrentModification,
            TransitionError::Persistence(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for TransitionError {
    fn from(err: DomainError) -> Self {
        TransitionError::Persistence(err.to_string())
    }
}
