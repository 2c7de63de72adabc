//! PostgreSQL implementation of ResultReader.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, SampleId};
use crate::ports::ResultReader;

use super::db_error;

#[derive(Clone)]
pub struct PostgresResultReader {
    pool: PgPool,
}

impl PostgresResultReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultReader for PostgresResultReader {
    async fn has_results(&self, sample_id: &SampleId) -> Result<bool, DomainError> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM analysis_results WHERE sample_id = $1)")
                .bind(sample_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to check analysis results"))?;
        Ok(result.0)
    }
}
