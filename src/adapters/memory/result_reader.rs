//! In-memory result presence, fed by tests and local tooling.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, SampleId};
use crate::ports::ResultReader;

#[derive(Default)]
pub struct InMemoryResultReader {
    counts: RwLock<HashMap<SampleId, usize>>,
}

impl InMemoryResultReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more result for the sample.
    pub async fn add_result(&self, sample_id: &SampleId) {
        *self.counts.write().await.entry(sample_id.clone()).or_insert(0) += 1;
    }
}

#[async_trait]
impl ResultReader for InMemoryResultReader {
    async fn has_results(&self, sample_id: &SampleId) -> Result<bool, DomainError> {
        Ok(self
            .counts
            .read()
            .await
            .get(sample_id)
            .map(|count| *count > 0)
            .unwrap_or(false))
    }
}
