//! Client-facing notification queries: list, mark read, unread summary.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{ClientPrincipal, DomainError, NotificationId, Timestamp};
use crate::domain::notification::{NotificationRecord, UnreadSummary};
use crate::ports::NotificationRepository;

#[derive(Debug, Clone, Error)]
pub enum InboxError {
    #[error("Notification not found: {0}")]
    NotFound(NotificationId),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

#[derive(Debug, Clone)]
pub struct InboxConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

pub struct NotificationInbox {
    repository: Arc<dyn NotificationRepository>,
    config: InboxConfig,
}

impl NotificationInbox {
    pub fn new(repository: Arc<dyn NotificationRepository>, config: InboxConfig) -> Self {
        Self { repository, config }
    }

    /// Latest notifications for the client, newest first.
    pub async fn list(
        &self,
        client: &ClientPrincipal,
        limit: Option<usize>,
    ) -> Result<Vec<NotificationRecord>, InboxError> {
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1));
        Ok(self.repository.recent_for(&client.refs(), limit).await?)
    }

    /// Marks one of the client's notifications read.
    pub async fn mark_read(
        &self,
        client: &ClientPrincipal,
        id: NotificationId,
    ) -> Result<NotificationRecord, InboxError> {
        self.repository
            .mark_read(&id, &client.refs(), Timestamp::now())
            .await?
            .ok_or(InboxError::NotFound(id))
    }

    pub async fn unread_summary(&self, client: &ClientPrincipal) -> Result<UnreadSummary, InboxError> {
        let unread = self.repository.unread_for(&client.refs()).await?;
        Ok(UnreadSummary::from_unread(unread))
    }
}
