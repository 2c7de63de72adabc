//! Notification HTTP adapter.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::NotificationAppState;
pub use routes::notification_router;
