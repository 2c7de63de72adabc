//! Audit sink that keeps records in memory and mirrors them to the log.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::audit::AuditRecord;
use crate::ports::{AuditError, AuditLogger};

#[derive(Default)]
pub struct InMemoryAuditLogger {
    records: RwLock<Vec<AuditRecord>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    /// Makes every subsequent append fail with `message`.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(AuditError::Unavailable(message));
        }
        tracing::info!(
            target: "audit",
            actor = %record.actor,
            action = %record.action,
            details = %record.details,
            "audit"
        );
        self.records.write().await.push(record);
        Ok(())
    }
}
