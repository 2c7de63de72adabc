//! FCM Provider - PushProvider over the Firebase Cloud Messaging HTTP v1 API.
//!
//! Authenticates with a service account: a short-lived RS256 assertion is
//! exchanged for an OAuth2 access token, which is cached until shortly
//! before it expires.
//!
//! HTTP v1 has no multicast endpoint, so a multicast is fanned out as one
//! request per address. Outbound requests are throttled by a shared
//! rate limiter.
//!
//! # Error mapping
//!
//! | FCM answer | Outcome |
//! |------------|---------|
//! | `UNREGISTERED`, 404 | `not-registered` |
//! | `INVALID_ARGUMENT`, 400 | `invalid-token` |
//! | `QUOTA_EXCEEDED`, 429 | `rate-limited` |
//! | `UNAVAILABLE`, `INTERNAL`, 5xx, transport errors | `transient` |
//! | 401, 403 | whole call fails with `ProviderError::Authentication` |

use async_trait::async_trait;
use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::domain::notification::{codes, redact, DeliveryOutcome, PushPayload};
use crate::ports::{ProviderError, PushProvider};

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Service account credentials and client settings for FCM.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub client_email: String,
    private_key: Secret<String>,
    pub token_uri: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Requests per second across all sends.
    pub requests_per_second: u32,
}

impl FcmConfig {
    /// Creates a configuration. Escaped `\n` sequences in the key (as found
    /// in environment variables) are turned back into newlines.
    pub fn new(
        project_id: impl Into<String>,
        client_email: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            client_email: client_email.into(),
            private_key: Secret::new(private_key.into().replace("\\n", "\n")),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            base_url: "https://fcm.googleapis.com".to_string(),
            timeout: Duration::from_secs(10),
            requests_per_second: 500,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = uri.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: Secret<String>,
    refresh_at: Instant,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: Message<'a>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    token: &'a str,
    notification: MessageNotification<'a>,
    data: &'a std::collections::BTreeMap<String, String>,
    android: AndroidConfig<'a>,
}

#[derive(Debug, Serialize)]
struct MessageNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct AndroidConfig<'a> {
    priority: &'static str,
    notification: AndroidNotification<'a>,
}

#[derive(Debug, Serialize)]
struct AndroidNotification<'a> {
    click_action: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Push provider backed by Firebase Cloud Messaging.
pub struct FcmPushProvider {
    config: FcmConfig,
    client: Client,
    signing_key: EncodingKey,
    limiter: Arc<DefaultDirectRateLimiter>,
    access_token: RwLock<Option<CachedToken>>,
    closed: AtomicBool,
}

impl FcmPushProvider {
    /// Builds the provider. Fails on an unparseable private key instead of
    /// at the first send.
    pub fn new(config: FcmConfig) -> Result<Self, ProviderError> {
        let signing_key = EncodingKey::from_rsa_pem(config.private_key.expose_secret().as_bytes())
            .map_err(|e| ProviderError::Configuration(format!("invalid private key: {}", e)))?;

        let rps = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            ProviderError::Configuration("requests_per_second must be positive".to_string())
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("http client: {}", e)))?;

        Ok(Self {
            config,
            client,
            signing_key,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            access_token: RwLock::new(None),
            closed: AtomicBool::new(false),
        })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.base_url, self.config.project_id
        )
    }

    async fn access_token(&self) -> Result<Secret<String>, ProviderError> {
        if let Some(cached) = self.access_token.read().await.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let mut slot = self.access_token.write().await;
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let fetched = self.fetch_access_token().await?;
        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let value = Secret::new(fetched.access_token);
        *slot = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn fetch_access_token(&self) -> Result<AccessTokenResponse, ProviderError> {
        let iat = Timestamp::now().as_unix_secs();
        let claims = AssertionClaims {
            iss: &self.config.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.config.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS as i64,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| ProviderError::Configuration(format!("cannot sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&self.config.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 | 401 | 403 => ProviderError::Authentication(body),
                500..=599 => ProviderError::Unavailable(format!("token endpoint {}: {}", status, body)),
                _ => ProviderError::Network(format!("token endpoint {}: {}", status, body)),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Network(format!("bad token response: {}", e)))
    }

    async fn send_one(
        &self,
        token: &str,
        payload: &PushPayload,
        access_token: &Secret<String>,
    ) -> Result<DeliveryOutcome, ProviderError> {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let body = SendRequest {
            message: Message {
                token,
                notification: MessageNotification {
                    title: &payload.title,
                    body: &payload.body,
                },
                data: &payload.data,
                android: AndroidConfig {
                    priority: "high",
                    notification: AndroidNotification {
                        click_action: PushPayload::CLICK_ACTION,
                    },
                },
            },
        };

        let response = match self
            .client
            .post(self.send_url())
            .bearer_auth(access_token.expose_secret())
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(token = %redact(token), error = %e, "fcm transport error");
                return Ok(DeliveryOutcome::failed(codes::TRANSIENT));
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(DeliveryOutcome::delivered());
        }
        let error_body = response.text().await.unwrap_or_default();
        handle_send_status(status, &error_body)
    }
}

/// Maps a failed send response to a per-address outcome, or to a
/// whole-call error when the credentials were refused.
fn handle_send_status(status: u16, error_body: &str) -> Result<DeliveryOutcome, ProviderError> {
    let envelope: ErrorEnvelope = serde_json::from_str(error_body).unwrap_or_default();
    let fcm_code = envelope
        .error
        .details
        .iter()
        .find_map(|d| d.error_code.clone())
        .unwrap_or_else(|| envelope.error.status.clone());

    match (status, fcm_code.as_str()) {
        (401 | 403, _) | (_, "THIRD_PARTY_AUTH_ERROR") => Err(ProviderError::Authentication(
            if envelope.error.message.is_empty() {
                format!("status {}", status)
            } else {
                envelope.error.message
            },
        )),
        (_, "UNREGISTERED") | (404, _) => Ok(DeliveryOutcome::failed(codes::NOT_REGISTERED)),
        (_, "INVALID_ARGUMENT") | (400, _) => Ok(DeliveryOutcome::failed(codes::INVALID_TOKEN)),
        (_, "QUOTA_EXCEEDED") | (429, _) => Ok(DeliveryOutcome::failed(codes::RATE_LIMITED)),
        (_, "UNAVAILABLE" | "INTERNAL") | (500..=599, _) => {
            Ok(DeliveryOutcome::failed(codes::TRANSIENT))
        }
        _ => Ok(DeliveryOutcome::failed(format!("fcm-{}", status))),
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    fn name(&self) -> &'static str {
        "fcm"
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> Result<Vec<DeliveryOutcome>, ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let access_token = self.access_token().await?;
        let results = join_all(
            tokens
                .iter()
                .map(|token| self.send_one(token, payload, &access_token)),
        )
        .await;

        let outcomes = results.into_iter().collect::<Result<Vec<_>, _>>();
        if matches!(outcomes, Err(ProviderError::Authentication(_))) {
            // Force a fresh token on the next call.
            *self.access_token.write().await = None;
        }
        outcomes
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *self.access_token.write().await = None;
        tracing::info!("fcm push provider shut down");
    }
}
