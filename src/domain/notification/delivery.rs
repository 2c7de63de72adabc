//! Push payloads and per-address delivery outcomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::NotificationRecord;

/// Canonical per-address error codes reported by push providers.
pub mod codes {
    pub const INVALID_TOKEN: &str = "invalid-token";
    pub const NOT_REGISTERED: &str = "not-registered";
    pub const TRANSIENT: &str = "transient";
    pub const RATE_LIMITED: &str = "rate-limited";
}

/// Message handed to a push provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    /// Flat string map; providers only carry string values.
    pub data: BTreeMap<String, String>,
}

impl PushPayload {
    pub const CLICK_ACTION: &'static str = "OPEN_SAMPLE_DETAIL";

    pub fn from_record(record: &NotificationRecord) -> Self {
        let mut data = BTreeMap::new();
        data.insert("notification_id".to_string(), record.id.to_string());
        data.insert("sample_id".to_string(), record.sample_id.to_string());
        data.insert("kind".to_string(), record.kind.as_str().to_string());
        data.insert(
            "previous_state".to_string(),
            record.data.previous_state.as_str().to_string(),
        );
        data.insert("new_state".to_string(), record.data.new_state.as_str().to_string());
        data.insert(
            "changed_at".to_string(),
            record.data.changed_at.as_datetime().to_rfc3339(),
        );
        data.insert("observations".to_string(), record.data.observations.clone());
        data.insert(
            "requires_action".to_string(),
            record.data.requires_action.to_string(),
        );
        data.insert("click_action".to_string(), Self::CLICK_ACTION.to_string());
        Self {
            title: record.title.clone(),
            body: record.message.clone(),
            data,
        }
    }
}

/// How a failed delivery should be treated by token bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    InvalidToken,
    NotRegistered,
    Transient,
    RateLimited,
    Other,
}

impl DeliveryFailure {
    /// Only permanent address failures deactivate a token.
    pub fn invalidates_token(&self) -> bool {
        matches!(self, DeliveryFailure::InvalidToken | DeliveryFailure::NotRegistered)
    }

    pub fn classify(code: &str) -> Self {
        match code {
            codes::INVALID_TOKEN | "messaging/invalid-registration-token" => {
                DeliveryFailure::InvalidToken
            }
            codes::NOT_REGISTERED | "messaging/registration-token-not-registered" => {
                DeliveryFailure::NotRegistered
            }
            codes::TRANSIENT => DeliveryFailure::Transient,
            codes::RATE_LIMITED => DeliveryFailure::RateLimited,
            _ => DeliveryFailure::Other,
        }
    }
}

/// Result for one address of a multicast, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub error_code: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered() -> Self {
        Self {
            success: true,
            error_code: None,
        }
    }

    pub fn failed(code: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: Some(code.into()),
        }
    }

    /// `None` for successful deliveries.
    pub fn failure(&self) -> Option<DeliveryFailure> {
        if self.success {
            return None;
        }
        Some(
            self.error_code
                .as_deref()
                .map(DeliveryFailure::classify)
                .unwrap_or(DeliveryFailure::Other),
        )
    }
}
