//! Axum router configuration for sample endpoints.

use axum::{
    routing::{get, put},
    Router,
};

use super::handlers::{get_sample, transition_sample, SampleAppState};

/// # Routes
///
/// - `GET /samples/:id` - Sample with allowed transitions
/// - `PUT /samples/:id/state` - Transition (staff only)
pub fn sample_router() -> Router<SampleAppState> {
    Router::new()
        .route("/samples/:id", get(get_sample))
        .route("/samples/:id/state", put(transition_sample))
}
