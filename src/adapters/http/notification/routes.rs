//! Axum router configuration for notification endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    deactivate_device, device_status, list_notifications, mark_read, register_device,
    unread_summary, NotificationAppState,
};

/// # Routes
///
/// - `POST /notifications/devices` - Register device token
/// - `GET /notifications/devices` - Own device tokens and counts
/// - `POST /notifications/devices/deactivate` - Deactivate device token
/// - `GET /notifications` - Latest notifications (`?limit=`)
/// - `GET /notifications/summary` - Unread summary
/// - `PUT /notifications/:id/read` - Mark read
pub fn notification_router() -> Router<NotificationAppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/summary", get(unread_summary))
        .route("/notifications/devices", post(register_device).get(device_status))
        .route("/notifications/devices/deactivate", post(deactivate_device))
        .route("/notifications/:id/read", put(mark_read))
}
