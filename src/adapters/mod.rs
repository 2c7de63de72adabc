//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process repositories (tests, database-less runs)
//! - `postgres` - PostgreSQL repositories and audit table
//! - `push` - Mobile push providers (FCM, sandbox)
//! - `websocket` - Realtime hub and socket handler
//! - `auth` - Session validators
//! - `http` - REST routes and middleware
//! - `jobs` - Background maintenance tasks

pub mod auth;
pub mod http;
pub mod jobs;
pub mod memory;
pub mod postgres;
pub mod push;
pub mod websocket;
