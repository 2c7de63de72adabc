//! Push provider port.
//!
//! A provider is an explicitly constructed, injected value. It owns its
//! connections and credentials and releases them in [`PushProvider::shutdown`];
//! there is no process-wide provider instance.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::notification::{DeliveryOutcome, PushPayload};

/// Whole-call failures. Per-address failures are reported as
/// [`DeliveryOutcome`]s instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with a different number of outcomes than
    /// addresses it was given.
    #[error("outcome count mismatch: sent {sent}, got {received}")]
    OutcomeMismatch { sent: usize, received: usize },

    #[error("invalid provider configuration: {0}")]
    Configuration(String),

    /// `shutdown` was already called.
    #[error("provider is shut down")]
    Closed,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Sends `payload` to every address, returning one outcome per address
    /// in the same order as `tokens`.
    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> Result<Vec<DeliveryOutcome>, ProviderError>;

    /// Releases provider resources. Later sends fail with `Closed`.
    async fn shutdown(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PushProvider) {}
    }

    #[test]
    fn mismatch_error_names_counts() {
        let err = ProviderError::OutcomeMismatch { sent: 3, received: 2 };
        assert_eq!(err.to_string(), "outcome count mismatch: sent 3, got 2");
    }
}
