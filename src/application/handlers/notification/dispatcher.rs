//! NotificationDispatcher - fans a state change out to every channel.
//!
//! 1. Compose and persist a notification record
//! 2. Deliver concurrently over push and realtime
//! 3. Deactivate addresses the push provider reports as permanently bad
//! 4. Store per-channel outcomes on the record
//!
//! Dispatch never fails. Every error is logged and reflected in the
//! outcomes stored on the record.

use std::sync::Arc;

use serde::Serialize;

use super::DeviceTokenRegistry;
use crate::domain::foundation::{ClientRef, NotificationId, SampleId, Timestamp};
use crate::domain::notification::{
    ChannelOutcomes, DeliveryFailure, DeliveryOutcome, NotificationData, NotificationKind, NotificationRecord,
    PushChannelOutcome, PushPayload,
};
use crate::domain::sample::SampleStateChanged;
use crate::ports::{NotificationRepository, ProviderError, PushProvider, RealtimeNotifier};

/// Realtime event name for a new notification.
pub const NOTIFICATION_EVENT: &str = "notification";

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on addresses per provider call.
    pub max_batch_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        // FCM rejects multicasts above 500 addresses.
        Self { max_batch_size: 500 }
    }
}

/// Payload emitted to live connections.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeNotification<'a> {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub sample_id: &'a SampleId,
    pub title: &'a str,
    pub message: &'a str,
    pub data: &'a NotificationData,
    pub timestamp: Timestamp,
}

impl<'a> From<&'a NotificationRecord> for RealtimeNotification<'a> {
    fn from(record: &'a NotificationRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            sample_id: &record.sample_id,
            title: &record.title,
            message: &record.message,
            data: &record.data,
            timestamp: record.created_at,
        }
    }
}

pub struct NotificationDispatcher {
    notifications: Arc<dyn NotificationRepository>,
    tokens: Arc<DeviceTokenRegistry>,
    push: Arc<dyn PushProvider>,
    realtime: Arc<dyn RealtimeNotifier>,
    config: DispatchConfig,
}

impl NotificationDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        tokens: Arc<DeviceTokenRegistry>,
        push: Arc<dyn PushProvider>,
        realtime: Arc<dyn RealtimeNotifier>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            notifications,
            tokens,
            push,
            realtime,
            config,
        }
    }

    /// Delivers the notification for one committed transition.
    pub async fn dispatch(&self, event: SampleStateChanged) -> NotificationRecord {
        let mut record = NotificationRecord::for_state_change(&event);

        // Delivery proceeds even when the record cannot be stored.
        let persisted = match self.notifications.save(&record).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    sample_id = %event.sample_id,
                    client = %event.client,
                    %error,
                    "failed to persist notification; delivering anyway"
                );
                false
            }
        };

        let payload = PushPayload::from_record(&record);
        let live_payload = match serde_json::to_value(RealtimeNotification::from(&record)) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, "failed to serialize realtime notification");
                None
            }
        };

        let (push, realtime_delivered) = tokio::join!(
            self.deliver_push(&event.client_refs, &payload),
            self.deliver_realtime(&event.client, live_payload),
        );

        let outcomes = ChannelOutcomes {
            push,
            realtime_delivered,
        };
        record.record_delivery(outcomes.clone());

        if persisted {
            if let Err(error) = self.notifications.record_delivery(&record.id, &outcomes).await {
                tracing::warn!(notification_id = %record.id, %error, "failed to store delivery outcomes");
            }
        }

        tracing::info!(
            sample_id = %event.sample_id,
            client = %event.client,
            new_state = event.new_state.as_str(),
            push_attempted = outcomes.push.attempted,
            push_delivered = outcomes.push.delivered,
            push_invalidated = outcomes.push.invalidated,
            realtime_delivered,
            "notification dispatched"
        );

        record
    }

    async fn deliver_realtime(&self, client: &ClientRef, payload: Option<serde_json::Value>) -> bool {
        match payload {
            Some(payload) => {
                self.realtime
                    .emit_to_client(client, NOTIFICATION_EVENT, payload)
                    .await
            }
            None => false,
        }
    }

    async fn deliver_push(&self, clients: &[ClientRef], payload: &PushPayload) -> PushChannelOutcome {
        let mut outcome = PushChannelOutcome::default();

        let tokens = match self.tokens.active_tokens_for(clients).await {
            Ok(tokens) => tokens,
            Err(error) => {
                tracing::warn!(%error, "failed to load device tokens");
                outcome.error = Some(error.to_string());
                return outcome;
            }
        };
        if tokens.is_empty() {
            tracing::debug!(clients = ?clients, "no active device tokens");
            return outcome;
        }

        for batch in tokens.chunks(self.config.max_batch_size.max(1)) {
            let addresses: Vec<String> = batch.iter().map(|t| t.token.clone()).collect();
            outcome.attempted += addresses.len();

            let results = match self.send_batch(&addresses, payload).await {
                Ok(results) => results,
                Err(error) => {
                    tracing::warn!(
                        provider = self.push.name(),
                        batch_size = addresses.len(),
                        %error,
                        "push batch failed; tokens left untouched"
                    );
                    outcome.error = Some(error.to_string());
                    continue;
                }
            };

            for (token, result) in batch.iter().zip(results) {
                match result.failure() {
                    None => outcome.delivered += 1,
                    Some(failure) if failure.invalidates_token() => {
                        match self.tokens.deactivate(&token.token).await {
                            Ok(()) => outcome.invalidated += 1,
                            Err(error) => tracing::warn!(
                                token = %token.redacted(),
                                %error,
                                "failed to deactivate invalid token"
                            ),
                        }
                    }
                    Some(failure) => log_retained_failure(token.redacted(), failure, &result.error_code),
                }
            }
        }

        outcome
    }

    async fn send_batch(
        &self,
        addresses: &[String],
        payload: &PushPayload,
    ) -> Result<Vec<DeliveryOutcome>, ProviderError> {
        let results = self.push.send_multicast(addresses, payload).await?;
        if results.len() != addresses.len() {
            return Err(ProviderError::OutcomeMismatch {
                sent: addresses.len(),
                received: results.len(),
            });
        }
        Ok(results)
    }
}

fn log_retained_failure(token: String, failure: DeliveryFailure, code: &Option<String>) {
    tracing::debug!(
        %token,
        failure = ?failure,
        code = code.as_deref().unwrap_or(""),
        "push delivery failed; token kept"
    );
}
