//! Sample repository port.
//!
//! Transitions are committed with a compare-and-swap on the sample version:
//! the new history entry, new state and optional rejection are written in a
//! single atomic update that only succeeds if the stored version still
//! equals the version the guards were evaluated against.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SampleId};
use crate::domain::sample::{Sample, TransitionCommit};

/// What happened to a version-guarded commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Applied; carries the sample as stored after the write.
    Committed(Sample),
    /// Someone else committed first.
    VersionConflict,
    /// The sample disappeared between read and write.
    NotFound,
}

#[async_trait]
pub trait SampleRepository: Send + Sync {
    /// Stores a newly registered sample.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure or duplicate id
    async fn save(&self, sample: &Sample) -> Result<(), DomainError>;

    /// Returns `None` if the sample does not exist.
    async fn find_by_id(&self, id: &SampleId) -> Result<Option<Sample>, DomainError>;

    /// Atomically appends the entry and moves the state if the version
    /// still matches `commit.expected_version`.
    async fn commit_transition(&self, commit: &TransitionCommit)
        -> Result<CommitOutcome, DomainError>;
}
