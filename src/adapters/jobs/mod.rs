//! Background jobs hosted by the server process.

mod token_janitor;

pub use token_janitor::{TokenJanitor, TokenJanitorConfig};
