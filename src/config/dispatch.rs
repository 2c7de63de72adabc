//! Realtime dispatch configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Settings for live connections
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Notifications sent to a socket right after it connects
    #[serde(default = "default_snapshot_size")]
    pub snapshot_size: usize,

    /// Outbound messages buffered per connection before events are dropped
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_range("DISPATCH__SNAPSHOT_SIZE", self.snapshot_size as u64, 0, 100)?;
        ValidationError::check_range(
            "DISPATCH__CONNECTION_BUFFER",
            self.connection_buffer as u64,
            2,
            4096,
        )
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            snapshot_size: default_snapshot_size(),
            connection_buffer: default_connection_buffer(),
        }
    }
}

fn default_snapshot_size() -> usize {
    10
}

fn default_connection_buffer() -> usize {
    64
}
