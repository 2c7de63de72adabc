//! In-memory sample store.
//!
//! The version check and the append happen under one write lock, which
//! gives the same all-or-nothing commit as the SQL adapter's conditional
//! update.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, SampleId};
use crate::domain::sample::{Sample, TransitionCommit, TransitionError};
use crate::ports::{CommitOutcome, SampleRepository};

#[derive(Default)]
pub struct InMemorySampleRepository {
    samples: RwLock<HashMap<SampleId, Sample>>,
}

impl InMemorySampleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SampleRepository for InMemorySampleRepository {
    async fn save(&self, sample: &Sample) -> Result<(), DomainError> {
        let mut samples = self.samples.write().await;
        if samples.contains_key(sample.id()) {
            return Err(DomainError::database("Sample already exists")
                .with_detail("sample_id", sample.id().as_str()));
        }
        samples.insert(sample.id().clone(), sample.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SampleId) -> Result<Option<Sample>, DomainError> {
        Ok(self.samples.read().await.get(id).cloned())
    }

    async fn commit_transition(&self, commit: &TransitionCommit) -> Result<CommitOutcome, DomainError> {
        let mut samples = self.samples.write().await;
        let Some(sample) = samples.get_mut(&commit.sample_id) else {
            return Ok(CommitOutcome::NotFound);
        };
        match sample.apply(commit) {
            Ok(()) => Ok(CommitOutcome::Committed(sample.clone())),
            Err(TransitionError::Conflict(_)) => Ok(CommitOutcome::VersionConflict),
            Err(other) => Err(DomainError::database(other.to_string())),
        }
    }
}
