//! Notification record storage port.

use async_trait::async_trait;

use crate::domain::foundation::{ClientRef, DomainError, NotificationId, Timestamp};
use crate::domain::notification::{ChannelOutcomes, NotificationRecord};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn save(&self, record: &NotificationRecord) -> Result<(), DomainError>;

    /// Stores channel outcomes and the derived status. Records already
    /// marked read keep their read status.
    async fn record_delivery(
        &self,
        id: &NotificationId,
        outcomes: &ChannelOutcomes,
    ) -> Result<(), DomainError>;

    /// Newest first, at most `limit` records addressed to any of `clients`.
    async fn recent_for(
        &self,
        clients: &[ClientRef],
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, DomainError>;

    /// Marks a record read if it belongs to one of `clients`.
    ///
    /// Returns `None` when no such record is visible to the caller.
    async fn mark_read(
        &self,
        id: &NotificationId,
        clients: &[ClientRef],
        at: Timestamp,
    ) -> Result<Option<NotificationRecord>, DomainError>;

    /// Every unread record addressed to any of `clients`.
    async fn unread_for(&self, clients: &[ClientRef]) -> Result<Vec<NotificationRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn NotificationRepository) {}
    }
}
