//! HTTP handlers for notification endpoints. All require a client account.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::{DeviceTokenRegistry, NotificationInbox, RegisterDeviceCommand};
use crate::domain::foundation::{NotificationId, ValidationError};
use crate::domain::notification::Platform;

use super::super::error::ApiError;
use super::super::middleware::RequireClient;
use super::dto::{
    DeactivateDeviceRequest, DeviceStatusResponse, DeviceTokenResponse, ListNotificationsQuery,
    NotificationListResponse, RegisterDeviceRequest,
};

#[derive(Clone)]
pub struct NotificationAppState {
    pub registry: Arc<DeviceTokenRegistry>,
    pub inbox: Arc<NotificationInbox>,
}

/// POST /notifications/devices - Register or refresh a device token
pub async fn register_device(
    State(state): State<NotificationAppState>,
    RequireClient(client): RequireClient,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let platform: Platform = request.platform.parse()?;
    let token = state
        .registry
        .register(RegisterDeviceCommand {
            owner: client,
            token: request.token,
            platform,
            device_info: request.device_info,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DeviceTokenResponse::from(token))))
}

/// POST /notifications/devices/deactivate - Stop pushing to one of the caller's devices (logout)
pub async fn deactivate_device(
    State(state): State<NotificationAppState>,
    RequireClient(client): RequireClient,
    Json(request): Json<DeactivateDeviceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.logout(&client, &request.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /notifications/devices - The caller's registered devices and counts
pub async fn device_status(
    State(state): State<NotificationAppState>,
    RequireClient(client): RequireClient,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.registry.tokens_for(&client).await?;
    Ok(Json(DeviceStatusResponse::new(&client, summary)))
}

/// GET /notifications?limit= - Latest notifications, newest first
pub async fn list_notifications(
    State(state): State<NotificationAppState>,
    RequireClient(client): RequireClient,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.inbox.list(&client, query.limit).await?;
    Ok(Json(NotificationListResponse::from(records)))
}

/// GET /notifications/summary - Unread counts and latest unread
pub async fn unread_summary(
    State(state): State<NotificationAppState>,
    RequireClient(client): RequireClient,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.inbox.unread_summary(&client).await?))
}

/// PUT /notifications/:id/read - Mark one notification read
pub async fn mark_read(
    State(state): State<NotificationAppState>,
    RequireClient(client): RequireClient,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: NotificationId = id
        .parse()
        .map_err(|_| ValidationError::invalid_format("notification_id", "expected a UUID"))?;
    Ok(Json(state.inbox.mark_read(&client, id).await?))
}
