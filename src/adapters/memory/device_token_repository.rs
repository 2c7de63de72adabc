//! In-memory device token store keyed by token text.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{ClientRef, DomainError, Timestamp};
use crate::domain::notification::DeviceToken;
use crate::ports::DeviceTokenRepository;

#[derive(Default)]
pub struct InMemoryDeviceTokenRepository {
    tokens: RwLock<HashMap<String, DeviceToken>>,
}

impl InMemoryDeviceTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    /// Moves a token's `last_used` back by `days`.
    pub async fn backdate(&self, token: &str, days: i64) {
        if let Some(stored) = self.tokens.write().await.get_mut(token) {
            stored.last_used = stored.last_used.minus_days(days);
        }
    }
}

#[async_trait]
impl DeviceTokenRepository for InMemoryDeviceTokenRepository {
    async fn upsert(&self, token: &DeviceToken) -> Result<(), DomainError> {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(&token.token) {
            Some(existing) => {
                existing.client_id = token.client_id.clone();
                existing.client_document = token.client_document.clone();
                existing.platform = token.platform;
                existing.device_info = token.device_info.clone();
                existing.is_active = true;
                existing.last_used = Timestamp::now();
            }
            None => {
                tokens.insert(token.token.clone(), token.clone());
            }
        }
        Ok(())
    }

    async fn deactivate(&self, token: &str) -> Result<bool, DomainError> {
        Ok(match self.tokens.write().await.get_mut(token) {
            Some(stored) => {
                stored.is_active = false;
                true
            }
            None => false,
        })
    }

    async fn deactivate_owned(&self, token: &str, owners: &[ClientRef]) -> Result<bool, DomainError> {
        Ok(match self.tokens.write().await.get_mut(token) {
            Some(stored) if owners.iter().any(|o| stored.belongs_to(o)) => {
                stored.is_active = false;
                true
            }
            _ => false,
        })
    }

    async fn find_all_for(&self, clients: &[ClientRef]) -> Result<Vec<DeviceToken>, DomainError> {
        let tokens = self.tokens.read().await;
        let mut found: Vec<DeviceToken> = tokens
            .values()
            .filter(|t| clients.iter().any(|c| t.belongs_to(c)))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.last_used.cmp(&a.last_used).then_with(|| a.token.cmp(&b.token)));
        Ok(found)
    }

    async fn find_active(&self, clients: &[ClientRef]) -> Result<Vec<DeviceToken>, DomainError> {
        let tokens = self.tokens.read().await;
        let mut found: Vec<DeviceToken> = tokens
            .values()
            .filter(|t| t.is_active && clients.iter().any(|c| t.belongs_to(c)))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.token.cmp(&b.token)));
        Ok(found)
    }

    async fn purge_inactive_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.is_active || !t.last_used.is_before(&cutoff));
        Ok((before - tokens.len()) as u64)
    }
}
