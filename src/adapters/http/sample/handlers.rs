//! HTTP handlers for sample endpoints.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::{GetSampleHandler, SampleStateMachine, SampleView, TransitionSampleCommand};
use crate::domain::foundation::{ClientPrincipal, ErrorCode, SampleId};
use crate::domain::sample::{Actor, SampleState};

use super::super::error::ApiError;
use super::super::middleware::{RequireAuth, RequireStaff};
use super::dto::{SampleResponse, TransitionRequest};

#[derive(Clone)]
pub struct SampleAppState {
    pub state_machine: Arc<SampleStateMachine>,
    pub samples: Arc<GetSampleHandler>,
}

fn not_found(id: &SampleId) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        ErrorCode::SampleNotFound,
        format!("Sample not found: {}", id),
    )
}

/// PUT /samples/:id/state - Move a sample to a new state (staff only)
pub async fn transition_sample(
    State(state): State<SampleAppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sample_id = SampleId::new(id)?;
    let target: SampleState = request.state.parse()?;

    let committed = state
        .state_machine
        .transition(TransitionSampleCommand {
            sample_id,
            target,
            actor: Actor::from(&user),
            observations: request.observations,
        })
        .await?;

    Ok(Json(SampleResponse::from(SampleView::of(committed))))
}

/// GET /samples/:id - Sample with its allowed transitions
///
/// Clients only see their own samples; anything else is reported as missing.
pub async fn get_sample(
    State(state): State<SampleAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let sample_id = SampleId::new(id)?;
    let view = state
        .samples
        .handle(&sample_id)
        .await?
        .ok_or_else(|| not_found(&sample_id))?;

    if !user.role.is_staff() {
        let principal = ClientPrincipal::try_from(&user)?;
        let owner_refs = view.sample.owner().refs();
        if !principal.refs().iter().any(|r| owner_refs.contains(r)) {
            return Err(not_found(&sample_id));
        }
    }

    Ok(Json(SampleResponse::from(view)))
}
