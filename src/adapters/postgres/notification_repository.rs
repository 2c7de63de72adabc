//! PostgreSQL implementation of NotificationRepository.
//!
//! Structured payload and channel outcomes are stored as JSONB.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::foundation::{ClientRef, DomainError, NotificationId, SampleId, Timestamp};
use crate::domain::notification::{
    ChannelOutcomes, NotificationKind, NotificationRecord, NotificationStatus,
};
use crate::ports::NotificationRepository;

use super::{corrupt, db_error, split_refs};

const COLUMNS: &str = "id, client_kind, client_value, sample_id, kind, title, message, \
                       data, outcomes, status, created_at, read_at";

/// Matches rows addressed to any of `$1` (ids) or `$2` (documents).
const OWNED_BY: &str = "((client_kind = 'id' AND client_value = ANY($1)) \
                        OR (client_kind = 'document' AND client_value = ANY($2)))";

#[derive(Clone)]
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::database(format!("Failed to encode notification: {}", e)))
}

fn parse_kind(kind: &str) -> Result<NotificationKind, DomainError> {
    match kind {
        "state_change" => Ok(NotificationKind::StateChange),
        other => Err(corrupt(format!("notification kind '{}'", other))),
    }
}

fn decode_outcomes(value: serde_json::Value) -> Result<ChannelOutcomes, DomainError> {
    serde_json::from_value(value).map_err(|e| corrupt(format!("outcomes: {}", e)))
}

fn row_to_record(row: sqlx::postgres::PgRow) -> Result<NotificationRecord, DomainError> {
    let id: uuid::Uuid = row.try_get("id").map_err(db_error("id"))?;
    let kind: String = row.try_get("client_kind").map_err(db_error("client_kind"))?;
    let value: String = row.try_get("client_value").map_err(db_error("client_value"))?;
    let sample_id: String = row.try_get("sample_id").map_err(db_error("sample_id"))?;
    let notification_kind: String = row.try_get("kind").map_err(db_error("kind"))?;
    let data: serde_json::Value = row.try_get("data").map_err(db_error("data"))?;
    let outcomes: serde_json::Value = row.try_get("outcomes").map_err(db_error("outcomes"))?;
    let status: String = row.try_get("status").map_err(db_error("status"))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(db_error("created_at"))?;
    let read_at: Option<DateTime<Utc>> = row.try_get("read_at").map_err(db_error("read_at"))?;

    Ok(NotificationRecord {
        id: NotificationId::from_uuid(id),
        client: ClientRef::from_parts(&kind, &value)
            .ok_or_else(|| corrupt(format!("client reference {}:{}", kind, value)))?,
        sample_id: SampleId::new(sample_id).map_err(|e| corrupt(e.to_string()))?,
        kind: parse_kind(&notification_kind)?,
        title: row.try_get("title").map_err(db_error("title"))?,
        message: row.try_get("message").map_err(db_error("message"))?,
        data: serde_json::from_value(data).map_err(|e| corrupt(e.to_string()))?,
        outcomes: decode_outcomes(outcomes)?,
        status: NotificationStatus::parse(&status)
            .ok_or_else(|| corrupt(format!("notification status '{}'", status)))?,
        created_at: Timestamp::from_datetime(created_at),
        read_at: read_at.map(Timestamp::from_datetime),
    })
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn save(&self, record: &NotificationRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, client_kind, client_value, sample_id, kind, title, message,
                data, outcomes, status, created_at, read_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.client.kind())
        .bind(record.client.value())
        .bind(record.sample_id.as_str())
        .bind(record.kind.as_str())
        .bind(&record.title)
        .bind(&record.message)
        .bind(encode(&record.data)?)
        .bind(encode(&record.outcomes)?)
        .bind(record.status.as_str())
        .bind(record.created_at.as_datetime())
        .bind(record.read_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert notification"))?;
        Ok(())
    }

    async fn record_delivery(
        &self,
        id: &NotificationId,
        outcomes: &ChannelOutcomes,
    ) -> Result<(), DomainError> {
        let status = if outcomes.any_delivered() {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        sqlx::query(
            r#"
            UPDATE notifications SET
                outcomes = $2,
                status = CASE WHEN status = 'read' THEN status ELSE $3 END
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(encode(outcomes)?)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record notification delivery"))?;
        Ok(())
    }

    async fn recent_for(
        &self,
        clients: &[ClientRef],
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, DomainError> {
        let (ids, documents) = split_refs(clients);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE {} ORDER BY created_at DESC LIMIT $3",
            COLUMNS, OWNED_BY
        ))
        .bind(&ids)
        .bind(&documents)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch notifications"))?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        clients: &[ClientRef],
        at: Timestamp,
    ) -> Result<Option<NotificationRecord>, DomainError> {
        let (ids, documents) = split_refs(clients);
        let row = sqlx::query(&format!(
            "UPDATE notifications SET \
                 read_at = COALESCE(read_at, $4), \
                 status = 'read' \
             WHERE id = $3 AND {} \
             RETURNING {}",
            OWNED_BY, COLUMNS
        ))
        .bind(&ids)
        .bind(&documents)
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to mark notification read"))?;

        row.map(row_to_record).transpose()
    }

    async fn unread_for(&self, clients: &[ClientRef]) -> Result<Vec<NotificationRecord>, DomainError> {
        let (ids, documents) = split_refs(clients);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE read_at IS NULL AND {} ORDER BY created_at DESC",
            COLUMNS, OWNED_BY
        ))
        .bind(&ids)
        .bind(&documents)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch unread notifications"))?;

        rows.into_iter().map(row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_accepts_stored_value() {
        let stored = NotificationKind::StateChange.as_str();
        assert_eq!(parse_kind(stored).unwrap(), NotificationKind::StateChange);
    }

    #[test]
    fn parse_kind_rejects_unknown_value() {
        assert!(parse_kind("digest").is_err());
    }

    #[test]
    fn stored_outcomes_decode() {
        let stored = encode(&ChannelOutcomes::default()).unwrap();
        assert_eq!(decode_outcomes(stored).unwrap(), ChannelOutcomes::default());
    }

    #[test]
    fn malformed_outcomes_are_reported_as_corrupt() {
        let err = decode_outcomes(serde_json::json!({"push": "lost"})).unwrap_err();
        assert!(err.to_string().contains("outcomes"));
    }
}
