//! Push provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// FCM caps a multicast at 500 addresses.
const MAX_BATCH: u64 = 500;

/// Which push provider the dispatcher talks to
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PushProviderKind {
    /// Records sends in memory and reports them delivered
    #[default]
    Sandbox,
    /// Firebase Cloud Messaging HTTP v1
    Fcm,
}

/// Push delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub provider: PushProviderKind,

    /// Firebase project id
    pub fcm_project_id: Option<String>,

    /// Service account email
    pub fcm_client_email: Option<String>,

    /// Service account private key (PEM, `\n` escapes allowed)
    pub fcm_private_key: Option<Secret<String>>,

    /// OAuth2 token endpoint override
    pub fcm_token_uri: Option<String>,

    /// FCM API base URL override
    pub fcm_endpoint: Option<String>,

    /// Addresses per provider call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PushConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate push configuration
    ///
    /// FCM needs project id, client email, and private key.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_range("PUSH__MAX_BATCH_SIZE", self.max_batch_size as u64, 1, MAX_BATCH)?;
        ValidationError::check_range(
            "PUSH__REQUESTS_PER_SECOND",
            self.requests_per_second as u64,
            1,
            10_000,
        )?;
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.provider == PushProviderKind::Fcm {
            if is_blank(self.fcm_project_id.as_deref()) {
                return Err(ValidationError::MissingRequired("PUSH__FCM_PROJECT_ID"));
            }
            if is_blank(self.fcm_client_email.as_deref()) {
                return Err(ValidationError::MissingRequired("PUSH__FCM_CLIENT_EMAIL"));
            }
            if is_blank(self.fcm_private_key.as_ref().map(|k| k.expose_secret().as_str())) {
                return Err(ValidationError::MissingRequired("PUSH__FCM_PRIVATE_KEY"));
            }
        }
        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider: PushProviderKind::default(),
            fcm_project_id: None,
            fcm_client_email: None,
            fcm_private_key: None,
            fcm_token_uri: None,
            fcm_endpoint: None,
            max_batch_size: default_max_batch_size(),
            requests_per_second: default_requests_per_second(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_max_batch_size() -> usize {
    500
}

fn default_requests_per_second() -> u32 {
    500
}

fn default_request_timeout() -> u64 {
    10
}
