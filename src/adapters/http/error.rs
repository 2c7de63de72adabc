//! API error responses.
//!
//! Every handler error is folded into an [`ApiError`], which carries the
//! HTTP status and the serialised [`ErrorResponse`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::{InboxError, RegistryError};
use crate::domain::foundation::{AuthError, DomainError, ErrorCode, ValidationError};
use crate::domain::sample::TransitionError;

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code.to_string(), message),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.body.code
    }

    fn internal(source: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %source, "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            "Internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        let status = match &err {
            TransitionError::NotFound(_) => StatusCode::NOT_FOUND,
            TransitionError::InvalidTransition { .. } | TransitionError::Precondition(_) => {
                StatusCode::BAD_REQUEST
            }
            TransitionError::Conflict(_) => StatusCode::CONFLICT,
            TransitionError::Persistence(_) => return Self::internal(&err),
        };
        let mut api = Self::new(status, err.code(), err.to_string());
        if let TransitionError::InvalidTransition { from, to } = &err {
            api.body = api
                .body
                .with_details(serde_json::json!({ "from": from, "to": to }));
        }
        api
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let details = serde_json::json!({ "field": err.field() });
        let mut api = Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationFailed, err.to_string());
        api.body = api.body.with_details(details);
        api
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(e) => e.into(),
            RegistryError::Storage(e) => e.into(),
        }
    }
}

impl From<InboxError> for ApiError {
    fn from(err: InboxError) -> Self {
        match err {
            InboxError::NotFound(_) => Self::new(
                StatusCode::NOT_FOUND,
                ErrorCode::NotificationNotFound,
                err.to_string(),
            ),
            InboxError::Storage(e) => e.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match err.code {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::SampleNotFound | ErrorCode::NotificationNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            _ => return Self::internal(&err),
        };
        Self::new(status, err.code, err.message)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::InsufficientPermissions => {
                Self::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, err.to_string())
            }
            AuthError::ServiceUnavailable(msg) => {
                tracing::error!("Auth service unavailable: {}", msg);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::Unauthorized,
                    "Authentication service unavailable",
                )
            }
            AuthError::InvalidToken | AuthError::TokenExpired => {
                Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SampleId;
    use crate::domain::sample::{SampleState, UnmetCondition};

    fn sample_id() -> SampleId {
        SampleId::new("S-1").unwrap()
    }

    #[test]
    fn transition_errors_map_to_statuses() {
        let cases = [
            (TransitionError::NotFound(sample_id()), StatusCode::NOT_FOUND),
            (
                TransitionError::InvalidTransition {
                    from: SampleState::Received,
                    to: SampleState::PendingResults,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                TransitionError::Precondition(UnmetCondition::NoResults),
                StatusCode::BAD_REQUEST,
            ),
            (TransitionError::Conflict(sample_id()), StatusCode::CONFLICT),
            (
                TransitionError::Persistence("pool timed out".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn persistence_details_are_not_leaked() {
        let api = ApiError::from(TransitionError::Persistence("password=hunter2".into()));
        assert_eq!(api.code(), "INTERNAL_ERROR");
        assert!(!api.body.message.contains("hunter2"));
    }

    #[test]
    fn validation_error_names_field() {
        let api = ApiError::from(ValidationError::too_short("token", 10, 3));
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.body.details.unwrap()["field"], "token");
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let api = ApiError::from(AuthError::InsufficientPermissions);
        assert_eq!(api.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::new("X", "y")).unwrap();
        assert!(json.get("details").is_none());
    }
}
