//! Stored notification records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::templates;
use crate::domain::foundation::{ClientRef, NotificationId, SampleId, Timestamp};
use crate::domain::sample::{SampleState, SampleStateChanged};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StateChange,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::StateChange => "state_change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NotificationStatus::Pending),
            "sent" => Some(NotificationStatus::Sent),
            "failed" => Some(NotificationStatus::Failed),
            "read" => Some(NotificationStatus::Read),
            _ => None,
        }
    }
}

/// Structured payload attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub previous_state: SampleState,
    pub new_state: SampleState,
    pub observations: String,
    pub requires_action: bool,
    pub changed_at: Timestamp,
}

/// Result of the push leg of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushChannelOutcome {
    pub attempted: usize,
    pub delivered: usize,
    pub invalidated: usize,
    /// Provider-level failure, if any batch failed as a whole.
    pub error: Option<String>,
}

/// Per-channel results recorded after delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutcomes {
    pub push: PushChannelOutcome,
    /// True if at least one live connection accepted the event.
    pub realtime_delivered: bool,
}

impl ChannelOutcomes {
    pub fn any_delivered(&self) -> bool {
        self.realtime_delivered || self.push.delivered > 0
    }
}

/// A notification created once per committed transition.
///
/// Only the channel outcomes, status and read marker change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub client: ClientRef,
    pub sample_id: SampleId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub outcomes: ChannelOutcomes,
    pub status: NotificationStatus,
    pub created_at: Timestamp,
    pub read_at: Option<Timestamp>,
}

impl NotificationRecord {
    /// Composes a pending record for a state change.
    pub fn for_state_change(event: &SampleStateChanged) -> Self {
        Self {
            id: NotificationId::new(),
            client: event.client.clone(),
            sample_id: event.sample_id.clone(),
            kind: NotificationKind::StateChange,
            title: templates::title_for(event.new_state),
            message: templates::message_for(event),
            data: NotificationData {
                previous_state: event.previous_state,
                new_state: event.new_state,
                observations: event.observations.clone(),
                requires_action: event.new_state.requires_action(),
                changed_at: event.occurred_at,
            },
            outcomes: ChannelOutcomes::default(),
            status: NotificationStatus::Pending,
            created_at: Timestamp::now(),
            read_at: None,
        }
    }

    /// Stores delivery results. A record already read stays read.
    pub fn record_delivery(&mut self, outcomes: ChannelOutcomes) {
        if self.status != NotificationStatus::Read {
            self.status = if outcomes.any_delivered() {
                NotificationStatus::Sent
            } else {
                NotificationStatus::Failed
            };
        }
        self.outcomes = outcomes;
    }

    /// Marks the record read. Returns false if it already was.
    pub fn mark_read(&mut self, at: Timestamp) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        self.status = NotificationStatus::Read;
        true
    }

    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

/// Unread notifications for one client, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadSummary {
    pub total: usize,
    pub by_kind: BTreeMap<NotificationKind, usize>,
    pub latest: Option<NotificationRecord>,
}

impl UnreadSummary {
    pub fn from_unread(records: Vec<NotificationRecord>) -> Self {
        let mut by_kind = BTreeMap::new();
        for record in &records {
            *by_kind.entry(record.kind).or_insert(0) += 1;
        }
        let total = records.len();
        let latest = records.into_iter().max_by_key(|r| r.created_at);
        Self {
            total,
            by_kind,
            latest,
        }
    }
}
