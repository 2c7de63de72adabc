//! Request and response bodies for notification endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::{ClientTokens, PlatformTokenCount};
use crate::domain::foundation::{ClientPrincipal, Timestamp};
use crate::domain::notification::{DeviceInfo, DeviceToken, NotificationRecord, Platform};

/// Body of `POST /notifications/devices`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDeviceRequest {
    pub token: String,
    pub platform: String,
    #[serde(default)]
    pub device_info: DeviceInfo,
}

/// Body of `POST /notifications/devices/deactivate`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeactivateDeviceRequest {
    pub token: String,
}

/// A registered device. The token itself is never echoed back in full.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceTokenResponse {
    pub token: String,
    pub platform: Platform,
    pub is_active: bool,
    pub last_used: Timestamp,
}

impl From<DeviceToken> for DeviceTokenResponse {
    fn from(token: DeviceToken) -> Self {
        Self {
            token: token.redacted(),
            platform: token.platform,
            is_active: token.is_active,
            last_used: token.last_used,
        }
    }
}

/// One entry of the device list in `GET /notifications/devices`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusEntry {
    pub token_preview: String,
    pub platform: Platform,
    pub is_active: bool,
    pub last_used: Timestamp,
    pub device_info: DeviceInfo,
}

/// Body of `GET /notifications/devices`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusResponse {
    pub client_id: String,
    pub client_document: Option<String>,
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub platforms: BTreeMap<String, PlatformTokenCount>,
    pub devices: Vec<DeviceStatusEntry>,
}

impl DeviceStatusResponse {
    pub fn new(client: &ClientPrincipal, summary: ClientTokens) -> Self {
        Self {
            client_id: client.client_id.as_str().to_string(),
            client_document: client.document.clone(),
            total: summary.total(),
            active: summary.active(),
            inactive: summary.inactive(),
            platforms: summary
                .by_platform()
                .into_iter()
                .map(|(platform, count)| (platform.as_str().to_string(), count))
                .collect(),
            devices: summary
                .tokens
                .into_iter()
                .map(|token| DeviceStatusEntry {
                    token_preview: token.redacted(),
                    platform: token.platform,
                    is_active: token.is_active,
                    last_used: token.last_used,
                    device_info: token.device_info,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationRecord>,
    pub count: usize,
}

impl From<Vec<NotificationRecord>> for NotificationListResponse {
    fn from(notifications: Vec<NotificationRecord>) -> Self {
        Self {
            count: notifications.len(),
            notifications,
        }
    }
}
