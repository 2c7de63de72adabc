//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, auth types and error types
//! that form the vocabulary of the laboratory domain.

mod auth;
mod client_ref;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser, ClientPrincipal, Role};
pub use client_ref::ClientRef;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ClientId, ConnectionId, NotificationId, SampleId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
