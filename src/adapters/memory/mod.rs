//! In-memory adapters.
//!
//! Used by tests and when the service runs without a database. State is
//! lost on restart.

mod audit_logger;
mod device_token_repository;
mod notification_repository;
mod result_reader;
mod sample_repository;

pub use audit_logger::InMemoryAuditLogger;
pub use device_token_repository::InMemoryDeviceTokenRepository;
pub use notification_repository::InMemoryNotificationRepository;
pub use result_reader::InMemoryResultReader;
pub use sample_repository::InMemorySampleRepository;
