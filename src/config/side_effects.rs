//! Side effect worker pool configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::SideEffectConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct SideEffectsConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
}

impl SideEffectsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_range("SIDE_EFFECTS__WORKERS", self.workers as u64, 1, 64)?;
        ValidationError::check_range(
            "SIDE_EFFECTS__QUEUE_CAPACITY",
            self.queue_capacity as u64,
            1,
            100_000,
        )?;
        ValidationError::check_range("SIDE_EFFECTS__TASK_TIMEOUT_SECS", self.task_timeout_secs, 1, 600)
    }

    /// Runner settings for [`crate::application::SideEffectRunner::start`]
    pub fn runner_config(&self) -> SideEffectConfig {
        SideEffectConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            task_timeout: Duration::from_secs(self.task_timeout_secs),
        }
    }
}

impl Default for SideEffectsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            task_timeout_secs: default_task_timeout(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_task_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_config_conversion() {
        let config = SideEffectsConfig {
            workers: 2,
            task_timeout_secs: 5,
            ..Default::default()
        };
        let runner = config.runner_config();
        assert_eq!(runner.workers, 2);
        assert_eq!(runner.queue_capacity, 1024);
        assert_eq!(runner.task_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = SideEffectsConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
