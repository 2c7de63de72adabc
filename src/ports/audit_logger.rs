//! Audit trail port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audit::AuditRecord;

#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only sink for audit records.
///
/// Callers log failures and move on; an audit write never blocks or fails
/// the operation being audited.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError>;
}
