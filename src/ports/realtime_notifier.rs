//! Best-effort live delivery to connected clients.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::foundation::ClientRef;

#[async_trait]
pub trait RealtimeNotifier: Send + Sync {
    /// Emits `event` to every live connection of `client`.
    ///
    /// Returns true only if at least one connection accepted it. Nothing is
    /// queued for clients that are offline.
    async fn emit_to_client(&self, client: &ClientRef, event: &str, payload: JsonValue) -> bool;
}
