//! WebSocket message types for the realtime notification channel.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, pending snapshot, live events,
//!   read confirmations, summaries, errors
//! - Client → Server: pings, mark-as-read, summary and status requests

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ClientRef, ConnectionId, NotificationId, Timestamp};
use crate::domain::notification::{NotificationRecord, UnreadSummary};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted and registered.
    Connected(ConnectedMessage),

    /// Latest notifications, sent once right after connecting.
    PendingNotifications(PendingNotificationsMessage),

    /// A named event pushed by the server (e.g. `notification`).
    Event(EventMessage),

    /// Heartbeat response.
    Pong(PongMessage),

    NotificationReadConfirmed(ReadConfirmedMessage),

    NotificationsSummary(UnreadSummary),

    ConnectionStatus(ConnectionStatusMessage),

    Error(ErrorMessage),
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectedMessage {
    pub connection_id: ConnectionId,
    pub client_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingNotificationsMessage {
    pub notifications: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventMessage {
    pub event: String,
    pub data: serde_json::Value,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadConfirmedMessage {
    pub notification_id: NotificationId,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatusMessage {
    pub connection_id: ConnectionId,
    pub connected_at: String,
    pub rooms: Vec<ClientRef>,
}

/// Error message sent to client.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

impl ServerMessage {
    pub fn event(event: impl Into<String>, data: serde_json::Value) -> Self {
        ServerMessage::Event(EventMessage {
            event: event.into(),
            data,
            timestamp: now_rfc3339(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: now_rfc3339(),
        })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: now_rfc3339(),
        })
    }

    pub fn read_confirmed(notification_id: NotificationId) -> Self {
        ServerMessage::NotificationReadConfirmed(ReadConfirmedMessage {
            notification_id,
            timestamp: now_rfc3339(),
        })
    }
}

pub(crate) fn now_rfc3339() -> String {
    Timestamp::now().as_datetime().to_rfc3339()
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat request.
    Ping,

    MarkAsRead { notification_id: NotificationId },

    GetNotificationsSummary,

    ConnectionStatus,
}
