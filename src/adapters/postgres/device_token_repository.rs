//! PostgreSQL implementation of DeviceTokenRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::foundation::{ClientId, ClientRef, DomainError, Timestamp};
use crate::domain::notification::{DeviceInfo, DeviceToken, Platform};
use crate::ports::DeviceTokenRepository;

use super::{corrupt, db_error, split_refs};

#[derive(Clone)]
pub struct PostgresDeviceTokenRepository {
    pool: PgPool,
}

impl PostgresDeviceTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_device_info(value: serde_json::Value) -> Result<DeviceInfo, DomainError> {
    serde_json::from_value(value).map_err(|e| corrupt(format!("device_info: {}", e)))
}

fn row_to_token(row: sqlx::postgres::PgRow) -> Result<DeviceToken, DomainError> {
    let client_id: String = row.try_get("client_id").map_err(db_error("client_id"))?;
    let platform: String = row.try_get("platform").map_err(db_error("platform"))?;
    let device_info: serde_json::Value = row.try_get("device_info").map_err(db_error("device_info"))?;
    let last_used: DateTime<Utc> = row.try_get("last_used").map_err(db_error("last_used"))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(db_error("created_at"))?;

    Ok(DeviceToken {
        token: row.try_get("token").map_err(db_error("token"))?,
        client_id: ClientId::new(client_id).map_err(|e| corrupt(e.to_string()))?,
        client_document: row.try_get("client_document").map_err(db_error("client_document"))?,
        platform: platform
            .parse::<Platform>()
            .map_err(|e| corrupt(e.to_string()))?,
        device_info: decode_device_info(device_info)?,
        is_active: row.try_get("is_active").map_err(db_error("is_active"))?,
        last_used: Timestamp::from_datetime(last_used),
        created_at: Timestamp::from_datetime(created_at),
    })
}

#[async_trait]
impl DeviceTokenRepository for PostgresDeviceTokenRepository {
    async fn upsert(&self, token: &DeviceToken) -> Result<(), DomainError> {
        let device_info = serde_json::to_value(&token.device_info)
            .map_err(|e| DomainError::database(format!("Failed to encode device info: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO device_tokens (
                token, client_id, client_document, platform, device_info,
                is_active, last_used, created_at
            ) VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            ON CONFLICT (token) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                client_document = EXCLUDED.client_document,
                platform = EXCLUDED.platform,
                device_info = EXCLUDED.device_info,
                is_active = TRUE,
                last_used = EXCLUDED.last_used
            "#,
        )
        .bind(&token.token)
        .bind(token.client_id.as_str())
        .bind(token.client_document.as_deref())
        .bind(token.platform.as_str())
        .bind(device_info)
        .bind(token.last_used.as_datetime())
        .bind(token.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to upsert device token"))?;
        Ok(())
    }

    async fn deactivate(&self, token: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE device_tokens SET is_active = FALSE WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to deactivate device token"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_owned(&self, token: &str, owners: &[ClientRef]) -> Result<bool, DomainError> {
        if owners.is_empty() {
            return Ok(false);
        }
        let (ids, documents) = split_refs(owners);
        let result = sqlx::query(
            r#"
            UPDATE device_tokens SET is_active = FALSE
            WHERE token = $1
              AND (client_id = ANY($2) OR client_document = ANY($3))
            "#,
        )
        .bind(token)
        .bind(&ids)
        .bind(&documents)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate device token"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_all_for(&self, clients: &[ClientRef]) -> Result<Vec<DeviceToken>, DomainError> {
        if clients.is_empty() {
            return Ok(Vec::new());
        }
        let (ids, documents) = split_refs(clients);
        let rows = sqlx::query(
            r#"
            SELECT token, client_id, client_document, platform, device_info,
                   is_active, last_used, created_at
            FROM device_tokens
            WHERE client_id = ANY($1) OR client_document = ANY($2)
            ORDER BY last_used DESC, token
            "#,
        )
        .bind(&ids)
        .bind(&documents)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch device tokens"))?;

        rows.into_iter().map(row_to_token).collect()
    }

    async fn find_active(&self, clients: &[ClientRef]) -> Result<Vec<DeviceToken>, DomainError> {
        if clients.is_empty() {
            return Ok(Vec::new());
        }
        let (ids, documents) = split_refs(clients);
        let rows = sqlx::query(
            r#"
            SELECT token, client_id, client_document, platform, device_info,
                   is_active, last_used, created_at
            FROM device_tokens
            WHERE is_active
              AND (client_id = ANY($1) OR client_document = ANY($2))
            ORDER BY token
            "#,
        )
        .bind(&ids)
        .bind(&documents)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch active device tokens"))?;

        rows.into_iter().map(row_to_token).collect()
    }

    async fn purge_inactive_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result =
            sqlx::query("DELETE FROM device_tokens WHERE NOT is_active AND last_used < $1")
                .bind(cutoff.as_datetime())
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to purge device tokens"))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_device_info_decodes() {
        let info = decode_device_info(serde_json::json!({"device_name": "Pixel 8"})).unwrap();
        assert_eq!(info.device_name.as_deref(), Some("Pixel 8"));
        assert_eq!(info.os_version, None);
    }

    #[test]
    fn malformed_device_info_is_reported_as_corrupt() {
        let err = decode_device_info(serde_json::json!(["not", "an", "object"])).unwrap_err();
        assert!(err.to_string().contains("device_info"));
    }
}
