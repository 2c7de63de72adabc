//! DeviceTokenRegistry - registration and pruning of push addresses.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::domain::foundation::{ClientPrincipal, ClientRef, DomainError, Timestamp, ValidationError};
use crate::domain::notification::{redact, validate_token, DeviceInfo, DeviceToken, Platform};
use crate::ports::DeviceTokenRepository;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// Command to register (or refresh) a device token.
#[derive(Debug, Clone)]
pub struct RegisterDeviceCommand {
    pub owner: ClientPrincipal,
    pub token: String,
    pub platform: Platform,
    pub device_info: DeviceInfo,
}

/// Active and total counts for one platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlatformTokenCount {
    pub total: usize,
    pub active: usize,
}

/// Everything a client has registered, active or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTokens {
    pub tokens: Vec<DeviceToken>,
}

impl ClientTokens {
    pub fn total(&self) -> usize {
        self.tokens.len()
    }

    pub fn active(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_active).count()
    }

    pub fn inactive(&self) -> usize {
        self.total() - self.active()
    }

    pub fn by_platform(&self) -> BTreeMap<Platform, PlatformTokenCount> {
        let mut counts: BTreeMap<Platform, PlatformTokenCount> = BTreeMap::new();
        for token in &self.tokens {
            let count = counts.entry(token.platform).or_default();
            count.total += 1;
            if token.is_active {
                count.active += 1;
            }
        }
        counts
    }
}

/// Owns the lifecycle of client push addresses.
///
/// Registering a token never touches the client's other tokens; a client
/// may be reachable on several devices at once.
pub struct DeviceTokenRegistry {
    repository: Arc<dyn DeviceTokenRepository>,
}

impl DeviceTokenRegistry {
    pub fn new(repository: Arc<dyn DeviceTokenRepository>) -> Self {
        Self { repository }
    }

    /// Upserts the token for its owner and marks it active.
    pub async fn register(&self, cmd: RegisterDeviceCommand) -> Result<DeviceToken, RegistryError> {
        let token = DeviceToken::register(&cmd.owner, cmd.token, cmd.platform, cmd.device_info)?;
        self.repository.upsert(&token).await?;
        tracing::info!(
            client_id = %token.client_id,
            platform = %token.platform,
            token = %token.redacted(),
            "device token registered"
        );
        Ok(token)
    }

    /// Deactivates a token the provider reported as no longer valid.
    /// Unknown or already inactive tokens are fine.
    pub async fn deactivate(&self, token: &str) -> Result<(), RegistryError> {
        let token = validate_token(token.to_string())?;
        let found = self.repository.deactivate(&token).await?;
        tracing::debug!(token = %redact(&token), found, "device token deactivated");
        Ok(())
    }

    /// Deactivates one of the caller's own tokens on logout.
    ///
    /// A token owned by someone else is left alone and reported the same
    /// way as an unknown one, so callers cannot probe for other tokens.
    pub async fn logout(&self, owner: &ClientPrincipal, token: &str) -> Result<(), RegistryError> {
        let token = validate_token(token.to_string())?;
        let found = self.repository.deactivate_owned(&token, &owner.refs()).await?;
        tracing::debug!(
            client_id = %owner.client_id,
            token = %redact(&token),
            found,
            "device token logged out"
        );
        Ok(())
    }

    /// All tokens registered by `owner`, most recently used first.
    pub async fn tokens_for(&self, owner: &ClientPrincipal) -> Result<ClientTokens, RegistryError> {
        let tokens = self.repository.find_all_for(&owner.refs()).await?;
        Ok(ClientTokens { tokens })
    }

    /// Active tokens for any of the given client references.
    pub async fn active_tokens_for(
        &self,
        clients: &[ClientRef],
    ) -> Result<Vec<DeviceToken>, RegistryError> {
        Ok(self.repository.find_active(clients).await?)
    }

    /// Deletes inactive tokens unused for longer than `retention`.
    pub async fn purge_stale(&self, retention: Duration) -> Result<u64, RegistryError> {
        let days = (retention.as_secs() / 86_400) as i64;
        let cutoff = Timestamp::now().minus_days(days);
        let purged = self.repository.purge_inactive_before(cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, retention_days = days, "purged stale device tokens");
        }
        Ok(purged)
    }
}
