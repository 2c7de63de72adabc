//! WebSocket adapters for realtime notification delivery.
//!
//! ```text
//! NotificationDispatcher ──emit_to_client──▶ RealtimeHub
//!                                            Room: id:c-1      Room: document:900
//!                                            ├── conn-a        ├── conn-a
//!                                            └── conn-b        └── conn-b
//!                                                   │
//!                                                   ▼
//!                                        ws_handler (one task pair per socket)
//! ```
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`hub`] - Connection registry and routing by client reference
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod hub;
pub mod messages;

pub use handler::{realtime_stats_router, websocket_router, ws_handler, WebSocketState};
pub use hub::{HubStats, RealtimeHub};
pub use messages::{ClientMessage, ServerMessage};
