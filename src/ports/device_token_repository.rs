//! Device token storage port.

use async_trait::async_trait;

use crate::domain::foundation::{ClientRef, DomainError, Timestamp};
use crate::domain::notification::DeviceToken;

/// Persistence for push addresses, keyed by the token text.
#[async_trait]
pub trait DeviceTokenRepository: Send + Sync {
    /// Inserts the token or, if it already exists, overwrites owner,
    /// platform and device info, reactivates it and refreshes `last_used`.
    async fn upsert(&self, token: &DeviceToken) -> Result<(), DomainError>;

    /// Marks a token inactive. Returns false if no such token exists.
    async fn deactivate(&self, token: &str) -> Result<bool, DomainError>;

    /// Marks a token inactive only if it belongs to one of `owners`.
    /// Returns false if no such token exists for them.
    async fn deactivate_owned(&self, token: &str, owners: &[ClientRef]) -> Result<bool, DomainError>;

    /// Every token of `clients`, active or not, most recently used first.
    async fn find_all_for(&self, clients: &[ClientRef]) -> Result<Vec<DeviceToken>, DomainError>;

    /// Active tokens matching any of `clients`, without duplicates.
    async fn find_active(&self, clients: &[ClientRef]) -> Result<Vec<DeviceToken>, DomainError>;

    /// Deletes inactive tokens last used before `cutoff`; returns how many.
    async fn purge_inactive_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_token_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn DeviceTokenRepository) {}
    }
}
