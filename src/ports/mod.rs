//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application layer and the outside world. Adapters implement these
//! ports.
//!
//! ## Storage Ports
//!
//! - `SampleRepository` - Samples with version-guarded transition commits
//! - `ResultReader` - Existence of analysis results
//! - `DeviceTokenRepository` - Push addresses per client
//! - `NotificationRepository` - Notification records and read markers
//!
//! ## Delivery Ports
//!
//! - `PushProvider` - Multicast push delivery
//! - `RealtimeNotifier` - Live delivery to connected clients
//! - `AuditLogger` - Append-only audit sink
//!
//! ## Auth Ports
//!
//! - `SessionValidator` - Bearer token validation

mod audit_logger;
mod device_token_repository;
mod notification_repository;
mod push_provider;
mod realtime_notifier;
mod result_reader;
mod sample_repository;
mod session_validator;

pub use audit_logger::{AuditError, AuditLogger};
pub use device_token_repository::DeviceTokenRepository;
pub use notification_repository::NotificationRepository;
pub use push_provider::{ProviderError, PushProvider};
pub use realtime_notifier::RealtimeNotifier;
pub use result_reader::ResultReader;
pub use sample_repository::{CommitOutcome, SampleRepository};
pub use session_validator::SessionValidator;
