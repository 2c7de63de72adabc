//! Mock session validator for testing.
//!
//! # Example
//!
//! ```ignore
//! use labtrack::adapters::auth::MockSessionValidator;
//!
//! let validator = MockSessionValidator::new()
//!     .with_client("client-token", "c-1", Some("900123"))
//!     .with_staff("lab-token", "lab-1");
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, UserId};
use crate::ports::SessionValidator;

/// Stores a map of tokens to users. Tokens not in the map return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation when set.
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.get_mut().insert(token.into(), user);
        self
    }

    /// Adds a token for a client account. Panics on an empty id.
    pub fn with_client(
        self,
        token: impl Into<String>,
        client_id: &str,
        document: Option<&str>,
    ) -> Self {
        let user = AuthenticatedUser::new(
            test_user_id(client_id),
            format!("Client {}", client_id),
            document.map(String::from),
            Role::Client,
        );
        self.with_user(token, user)
    }

    /// Adds a token for a laboratorist. Panics on an empty id.
    pub fn with_staff(self, token: impl Into<String>, user_id: &str) -> Self {
        let user = AuthenticatedUser::new(
            test_user_id(user_id),
            format!("Lab {}", user_id),
            None,
            Role::Laboratorist,
        );
        self.with_user(token, user)
    }

    pub fn with_error(mut self, error: AuthError) -> Self {
        *self.force_error.get_mut() = Some(error);
        self
    }

    pub async fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens.write().await.insert(token.into(), user);
    }

    pub async fn remove_token(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }
}

fn test_user_id(id: &str) -> UserId {
    match UserId::new(id) {
        Ok(id) => id,
        Err(e) => panic!("invalid test user id {:?}: {}", id, e),
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self.force_error.read().await.clone() {
            return Err(error);
        }
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
