//! Push addresses registered by client devices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ClientId, ClientPrincipal, ClientRef, Timestamp, ValidationError};

/// Shortest token any supported provider issues.
pub const MIN_TOKEN_LENGTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Android,
    Ios,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "web" => Ok(Platform::Web),
            other => Err(ValidationError::invalid_format(
                "platform",
                format!("expected android, ios or web, got '{}'", other),
            )),
        }
    }
}

/// Optional description of the registering device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
    pub app_build: Option<String>,
}

/// A push address owned by one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceToken {
    pub token: String,
    pub client_id: ClientId,
    pub client_document: Option<String>,
    pub platform: Platform,
    pub device_info: DeviceInfo,
    pub is_active: bool,
    pub last_used: Timestamp,
    pub created_at: Timestamp,
}

impl DeviceToken {
    /// Builds an active token for `owner`, validating the token text.
    pub fn register(
        owner: &ClientPrincipal,
        token: impl Into<String>,
        platform: Platform,
        device_info: DeviceInfo,
    ) -> Result<Self, ValidationError> {
        let token = validate_token(token.into())?;
        let now = Timestamp::now();
        Ok(Self {
            token,
            client_id: owner.client_id.clone(),
            client_document: owner.document.clone(),
            platform,
            device_info,
            is_active: true,
            last_used: now,
            created_at: now,
        })
    }

    /// True if this token is addressed by `client`.
    pub fn belongs_to(&self, client: &ClientRef) -> bool {
        match client {
            ClientRef::ById(id) => &self.client_id == id,
            ClientRef::ByDocument(doc) => self.client_document.as_deref() == Some(doc.as_str()),
        }
    }

    /// Shortened form for logs.
    pub fn redacted(&self) -> String {
        redact(&self.token)
    }
}

/// Trims and checks a raw token.
pub fn validate_token(token: String) -> Result<String, ValidationError> {
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(ValidationError::empty_field("token"));
    }
    if token.len() < MIN_TOKEN_LENGTH {
        return Err(ValidationError::too_short("token", MIN_TOKEN_LENGTH, token.len()));
    }
    Ok(token)
}

/// Keeps the first characters of a token, enough to correlate logs.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(12).collect();
    format!("{}...", prefix)
}
