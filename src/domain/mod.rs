//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, client references, auth, errors)
//! - `sample` - Sample lifecycle, guard table and transition events
//! - `notification` - Notification records, device tokens, delivery outcomes
//! - `audit` - Audit trail entries

pub mod audit;
pub mod foundation;
pub mod notification;
pub mod sample;
