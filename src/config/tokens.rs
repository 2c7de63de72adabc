//! Device token retention configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::jobs::TokenJanitorConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct TokensConfig {
    /// Days an inactive token is kept before it is purged
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Seconds between purge passes
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

impl TokensConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_range("TOKENS__RETENTION_DAYS", self.retention_days, 1, 3650)?;
        ValidationError::check_range(
            "TOKENS__PURGE_INTERVAL_SECS",
            self.purge_interval_secs,
            60,
            7 * 86_400,
        )
    }

    pub fn janitor_config(&self) -> TokenJanitorConfig {
        TokenJanitorConfig {
            retention: Duration::from_secs(self.retention_days * 86_400),
            interval: Duration::from_secs(self.purge_interval_secs),
        }
    }
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

fn default_retention_days() -> u64 {
    30
}

fn default_purge_interval() -> u64 {
    86_400
}
