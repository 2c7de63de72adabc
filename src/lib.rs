//! labtrack - Laboratory sample tracking
//!
//! Moves laboratory samples through their lifecycle and keeps clients
//! informed: every committed state change is audited and announced over
//! mobile push and live WebSocket connections.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
