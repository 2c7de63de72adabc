//! TokenJanitor - periodic removal of stale device tokens.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `retention` | 30 days | How long an inactive token is kept |
//! | `interval` | 24h | Time between purges |

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::handlers::notification::DeviceTokenRegistry;

#[derive(Debug, Clone)]
pub struct TokenJanitorConfig {
    pub retention: Duration,
    pub interval: Duration,
}

impl Default for TokenJanitorConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(30 * 86_400),
            interval: Duration::from_secs(86_400),
        }
    }
}

pub struct TokenJanitor {
    registry: Arc<DeviceTokenRegistry>,
    config: TokenJanitorConfig,
}

impl TokenJanitor {
    pub fn new(registry: Arc<DeviceTokenRegistry>, config: TokenJanitorConfig) -> Self {
        Self { registry, config }
    }

    /// Purges on every tick until the shutdown flag flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("token janitor stopped");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.purge_once().await;
                }
            }
        }
    }

    /// One purge pass. Errors are logged; the next tick retries.
    pub async fn purge_once(&self) -> u64 {
        match self.registry.purge_stale(self.config.retention).await {
            Ok(purged) => purged,
            Err(error) => {
                tracing::warn!(%error, "device token purge failed");
                0
            }
        }
    }
}
