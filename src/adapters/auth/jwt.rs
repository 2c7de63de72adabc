//! HS256 session validator.
//!
//! Access tokens are issued by the laboratory's identity service and signed
//! with a shared secret. Claims:
//!
//! | Claim | Meaning |
//! |-------|---------|
//! | `sub` | user id (client id for clients) |
//! | `name` | display name |
//! | `document` | national id / tax document, optional |
//! | `role` | `client`, `laboratorist` or `administrator` |
//! | `iss` | checked when an issuer is configured |
//! | `exp` | required |

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, Timestamp, UserId};
use crate::ports::SessionValidator;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document: Option<String>,
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    exp: i64,
}

pub struct JwtSessionValidator {
    secret: Secret<String>,
    issuer: Option<String>,
}

impl JwtSessionValidator {
    pub fn new(secret: Secret<String>, issuer: Option<String>) -> Self {
        Self { secret, issuer }
    }

    /// Signs a token for `user`. Used by tooling and tests; production
    /// tokens come from the identity service.
    pub fn issue(&self, user: &AuthenticatedUser, ttl: Duration) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            document: user.document.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            exp: Timestamp::now().plus_secs(ttl.as_secs()).as_unix_secs(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AuthError::service_unavailable(format!("cannot sign token: {}", e)))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let claims = decode::<SessionClaims>(token, &key, &self.validation())
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    ErrorKind::InvalidIssuer => {
                        tracing::warn!("Invalid issuer in token");
                        AuthError::InvalidToken
                    }
                    _ => {
                        tracing::debug!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            })?
            .claims;

        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Invalid user ID in token: {}", claims.sub);
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(
            user_id,
            claims.name,
            claims.document.filter(|d| !d.is_empty()),
            claims.role,
        ))
    }
}
