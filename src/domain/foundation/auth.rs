//! Authentication types for the domain layer.
//!
//! These types represent a caller extracted from a validated bearer token.
//! Any identity provider can populate them via the `SessionValidator` port.
//!
//! Realtime admission is gated on the *type* of principal: only a
//! [`ClientPrincipal`] can join a notification room, and one can only be
//! built from a user whose role is [`Role::Client`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ClientId, ClientRef, UserId};

/// Role claim carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Laboratorist,
    Administrator,
}

impl Role {
    /// Laboratory staff may drive sample transitions.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Laboratorist | Role::Administrator)
    }
}

/// Authenticated user extracted from a validated token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub name: String,
    /// National id / tax document; clients are also addressed by it.
    pub document: Option<String>,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, name: impl Into<String>, document: Option<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            document,
            role,
        }
    }

    /// Fails with `InsufficientPermissions` unless the user is staff.
    pub fn require_staff(&self) -> Result<(), AuthError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }
}

/// A client that may receive realtime notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPrincipal {
    pub client_id: ClientId,
    pub document: Option<String>,
}

impl ClientPrincipal {
    /// Every reference the client may be addressed by, id first.
    pub fn refs(&self) -> Vec<ClientRef> {
        let mut refs = vec![ClientRef::ById(self.client_id.clone())];
        if let Some(doc) = self.document.as_ref().filter(|d| !d.is_empty()) {
            refs.push(ClientRef::ByDocument(doc.clone()));
        }
        refs
    }
}

impl TryFrom<&AuthenticatedUser> for ClientPrincipal {
    type Error = AuthError;

    fn try_from(user: &AuthenticatedUser) -> Result<Self, Self::Error> {
        if user.role != Role::Client {
            return Err(AuthError::InsufficientPermissions);
        }
        let client_id =
            ClientId::new(user.id.as_str()).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            client_id,
            document: user.document.clone(),
        })
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// Valid token, wrong role for this action.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}
