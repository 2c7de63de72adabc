//! HTTP adapters - REST and websocket endpoints.
//!
//! Each area has its own router and state; [`api_router`] assembles them
//! behind the auth middleware.

pub mod error;
pub mod middleware;
pub mod notification;
pub mod sample;

use axum::Router;

use crate::adapters::websocket::{realtime_stats_router, websocket_router, WebSocketState};

pub use error::{ApiError, ErrorResponse};
pub use middleware::AuthState;
pub use notification::{notification_router, NotificationAppState};
pub use sample::{sample_router, SampleAppState};

/// Builds the full application router.
///
/// REST routes, including the staff-only hub stats, pass through
/// `auth_middleware`. The websocket route authenticates its own `token`
/// query parameter, since browsers cannot set headers on an upgrade request.
pub fn api_router(
    samples: SampleAppState,
    notifications: NotificationAppState,
    realtime: WebSocketState,
    auth: AuthState,
) -> Router {
    let rest = Router::new()
        .merge(sample_router().with_state(samples))
        .merge(notification_router().with_state(notifications))
        .merge(realtime_stats_router().with_state(realtime.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(rest)
        .merge(websocket_router().with_state(realtime))
}
