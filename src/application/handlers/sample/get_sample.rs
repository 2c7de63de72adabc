//! GetSampleHandler - sample lookup with the targets reachable from it.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, SampleId, StateMachine};
use crate::domain::sample::{Sample, SampleState};
use crate::ports::SampleRepository;

/// A sample plus the states it can structurally move to next.
#[derive(Debug, Clone)]
pub struct SampleView {
    pub sample: Sample,
    pub allowed_transitions: Vec<SampleState>,
}

impl SampleView {
    /// Data-dependent guards (results, observations) are not evaluated here;
    /// a listed target may still be refused when requested.
    pub fn of(sample: Sample) -> Self {
        let mut allowed_transitions = sample.state().valid_transitions();
        if sample.selected_analyses().is_empty() {
            allowed_transitions.retain(|s| *s != SampleState::InQuotation);
        }
        Self {
            sample,
            allowed_transitions,
        }
    }
}

pub struct GetSampleHandler {
    samples: Arc<dyn SampleRepository>,
}

impl GetSampleHandler {
    pub fn new(samples: Arc<dyn SampleRepository>) -> Self {
        Self { samples }
    }

    /// Returns `None` if the sample does not exist.
    pub async fn handle(&self, id: &SampleId) -> Result<Option<SampleView>, DomainError> {
        Ok(self.samples.find_by_id(id).await?.map(SampleView::of))
    }
}
