//! Sample HTTP adapter.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::SampleAppState;
pub use routes::sample_router;
