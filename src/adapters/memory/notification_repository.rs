//! In-memory notification store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{ClientRef, DomainError, NotificationId, Timestamp};
use crate::domain::notification::{ChannelOutcomes, NotificationRecord};
use crate::ports::NotificationRepository;

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    records: RwLock<Vec<NotificationRecord>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn addressed_to(record: &NotificationRecord, clients: &[ClientRef]) -> bool {
    clients.contains(&record.client)
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, record: &NotificationRecord) -> Result<(), DomainError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn record_delivery(
        &self,
        id: &NotificationId,
        outcomes: &ChannelOutcomes,
    ) -> Result<(), DomainError> {
        if let Some(record) = self.records.write().await.iter_mut().find(|r| &r.id == id) {
            record.record_delivery(outcomes.clone());
        }
        Ok(())
    }

    async fn recent_for(
        &self,
        clients: &[ClientRef],
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, DomainError> {
        let mut found: Vec<NotificationRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| addressed_to(r, clients))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        Ok(found)
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        clients: &[ClientRef],
        at: Timestamp,
    ) -> Result<Option<NotificationRecord>, DomainError> {
        let mut records = self.records.write().await;
        Ok(records
            .iter_mut()
            .find(|r| &r.id == id && addressed_to(r, clients))
            .map(|record| {
                record.mark_read(at);
                record.clone()
            }))
    }

    async fn unread_for(&self, clients: &[ClientRef]) -> Result<Vec<NotificationRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.is_unread() && addressed_to(r, clients))
            .cloned()
            .collect())
    }
}
