//! PostgreSQL implementation of AuditLogger.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::audit::AuditRecord;
use crate::ports::{AuditError, AuditLogger};

#[derive(Clone)]
pub struct PostgresAuditLogger {
    pool: PgPool,
}

impl PostgresAuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogger for PostgresAuditLogger {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (actor_id, action, details, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.actor.as_str())
        .bind(&record.action)
        .bind(&record.details)
        .bind(record.timestamp.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
