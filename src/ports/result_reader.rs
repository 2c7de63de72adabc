//! Read access to analysis results owned by the results module.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SampleId};

#[async_trait]
pub trait ResultReader: Send + Sync {
    /// True if at least one analysis result is recorded for the sample.
    async fn has_results(&self, sample_id: &SampleId) -> Result<bool, DomainError>;
}
