//! PostgreSQL implementation of SampleRepository.
//!
//! The sample row carries the current state and a version counter; history
//! entries live in `sample_history`. A transition commit is one transaction:
//! a version-guarded `UPDATE`, then the history insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row};

use crate::domain::foundation::{ClientId, ClientRef, DomainError, SampleId, Timestamp, UserId};
use crate::domain::sample::{
    Actor, Rejection, Sample, SampleOwner, SampleState, TransitionCommit, TransitionEntry,
};
use crate::ports::{CommitOutcome, SampleRepository};

use super::{corrupt, db_error};

#[derive(Clone)]
pub struct PostgresSampleRepository {
    pool: PgPool,
}

impl PostgresSampleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_entry(
    conn: &mut PgConnection,
    sample_id: &SampleId,
    entry: &TransitionEntry,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO sample_history (
            sample_id, state, previous_state, actor_id, actor_name, actor_document,
            observations, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(sample_id.as_str())
    .bind(entry.state.as_str())
    .bind(entry.previous_state.map(|s| s.as_str()))
    .bind(entry.actor.id.as_str())
    .bind(&entry.actor.name)
    .bind(entry.actor.document.as_deref())
    .bind(&entry.observations)
    .bind(entry.timestamp.as_datetime())
    .execute(conn)
    .await
    .map_err(db_error("Failed to insert sample history"))?;
    Ok(())
}

async fn load(conn: &mut PgConnection, id: &SampleId) -> Result<Option<Sample>, DomainError> {
    let row = sqlx::query(
        r#"
        SELECT id, client_id, client_document, selected_analyses,
               rejection_reason, rejected_at, version, created_at
        FROM samples
        WHERE id = $1
        "#,
    )
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("Failed to fetch sample"))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let history_rows = sqlx::query(
        r#"
        SELECT state, previous_state, actor_id, actor_name, actor_document,
               observations, created_at
        FROM sample_history
        WHERE sample_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("Failed to fetch sample history"))?;

    let history = history_rows
        .iter()
        .map(row_to_entry)
        .collect::<Result<Vec<_>, _>>()?;

    let client_id: Option<String> = row.try_get("client_id").map_err(db_error("client_id"))?;
    let client_id = client_id
        .map(ClientId::new)
        .transpose()
        .map_err(|e| corrupt(e.to_string()))?;
    let owner = SampleOwner::new(
        client_id,
        row.try_get("client_document").map_err(db_error("client_document"))?,
    )
    .map_err(|e| corrupt(e.to_string()))?;

    let reason: Option<String> = row.try_get("rejection_reason").map_err(db_error("rejection_reason"))?;
    let rejected_at: Option<DateTime<Utc>> =
        row.try_get("rejected_at").map_err(db_error("rejected_at"))?;
    let rejection = match (reason, rejected_at) {
        (Some(reason), Some(at)) => Some(Rejection {
            reason,
            rejected_at: Timestamp::from_datetime(at),
        }),
        _ => None,
    };

    let version: i64 = row.try_get("version").map_err(db_error("version"))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(db_error("created_at"))?;

    Sample::reconstitute(
        id.clone(),
        owner,
        history,
        row.try_get("selected_analyses").map_err(db_error("selected_analyses"))?,
        rejection,
        version as u64,
        Timestamp::from_datetime(created_at),
    )
    .map(Some)
}

fn parse_state(raw: &str) -> Result<SampleState, DomainError> {
    raw.parse().map_err(|_| corrupt(format!("unknown sample state '{}'", raw)))
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<TransitionEntry, DomainError> {
    let state: String = row.try_get("state").map_err(db_error("state"))?;
    let previous: Option<String> = row.try_get("previous_state").map_err(db_error("previous_state"))?;
    let actor_id: String = row.try_get("actor_id").map_err(db_error("actor_id"))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(db_error("created_at"))?;

    Ok(TransitionEntry {
        state: parse_state(&state)?,
        previous_state: previous.as_deref().map(parse_state).transpose()?,
        timestamp: Timestamp::from_datetime(created_at),
        actor: Actor {
            id: UserId::new(actor_id).map_err(|e| corrupt(e.to_string()))?,
            name: row.try_get("actor_name").map_err(db_error("actor_name"))?,
            document: row.try_get("actor_document").map_err(db_error("actor_document"))?,
        },
        observations: row.try_get("observations").map_err(db_error("observations"))?,
    })
}

#[async_trait]
impl SampleRepository for PostgresSampleRepository {
    async fn save(&self, sample: &Sample) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let client_id = match sample.client_ref() {
            ClientRef::ById(id) => Some(id.as_str()),
            ClientRef::ByDocument(_) => None,
        };

        sqlx::query(
            r#"
            INSERT INTO samples (
                id, client_id, client_document, selected_analyses, state,
                rejection_reason, rejected_at, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(sample.id().as_str())
        .bind(client_id)
        .bind(sample.owner().document())
        .bind(sample.selected_analyses())
        .bind(sample.state().as_str())
        .bind(sample.rejection().map(|r| r.reason.as_str()))
        .bind(sample.rejection().map(|r| *r.rejected_at.as_datetime()))
        .bind(sample.version() as i64)
        .bind(sample.created_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert sample"))?;

        for entry in sample.history() {
            insert_entry(&mut tx, sample.id(), entry).await?;
        }

        tx.commit().await.map_err(db_error("Failed to commit sample"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &SampleId) -> Result<Option<Sample>, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        load(&mut conn, id).await
    }

    async fn commit_transition(
        &self,
        commit: &TransitionCommit,
    ) -> Result<CommitOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let updated = sqlx::query(
            r#"
            UPDATE samples SET
                state = $3,
                version = version + 1,
                rejection_reason = COALESCE($4, rejection_reason),
                rejected_at = COALESCE($5, rejected_at),
                updated_at = $6
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(commit.sample_id.as_str())
        .bind(commit.expected_version as i64)
        .bind(commit.entry.state.as_str())
        .bind(commit.rejection.as_ref().map(|r| r.reason.as_str()))
        .bind(commit.rejection.as_ref().map(|r| *r.rejected_at.as_datetime()))
        .bind(commit.entry.timestamp.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to update sample state"))?;

        if updated.rows_affected() == 0 {
            let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM samples WHERE id = $1)")
                .bind(commit.sample_id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("Failed to check sample existence"))?;
            return Ok(if exists.0 {
                CommitOutcome::VersionConflict
            } else {
                CommitOutcome::NotFound
            });
        }

        insert_entry(&mut tx, &commit.sample_id, &commit.entry).await?;
        let committed = load(&mut tx, &commit.sample_id)
            .await?
            .ok_or_else(|| corrupt(format!("sample {} vanished mid-commit", commit.sample_id)))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transition"))?;
        Ok(CommitOutcome::Committed(committed))
    }
}
