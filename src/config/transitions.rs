//! Sample transition configuration

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionsConfig {
    /// Attempts at committing before a version conflict is reported
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

impl TransitionsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_range(
            "TRANSITIONS__MAX_COMMIT_ATTEMPTS",
            self.max_commit_attempts as u64,
            1,
            10,
        )
    }
}

impl Default for TransitionsConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_max_commit_attempts(),
        }
    }
}

fn default_max_commit_attempts() -> u32 {
    3
}
