//! Request and response bodies for sample endpoints.

use serde::{Deserialize, Serialize};

use crate::application::SampleView;
use crate::domain::foundation::{ClientRef, Timestamp};
use crate::domain::sample::{Rejection, SampleState, TransitionEntry};

/// Body of `PUT /samples/:id/state`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    /// Target state wire name, e.g. `in_analysis`.
    pub state: String,
    #[serde(default)]
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateResponse {
    pub code: SampleState,
    pub label: &'static str,
}

impl From<SampleState> for StateResponse {
    fn from(state: SampleState) -> Self {
        Self {
            code: state,
            label: state.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleResponse {
    pub id: String,
    pub client: ClientRef,
    pub state: StateResponse,
    pub history: Vec<TransitionEntry>,
    pub selected_analyses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    pub version: u64,
    pub created_at: Timestamp,
    pub allowed_transitions: Vec<StateResponse>,
}

impl From<SampleView> for SampleResponse {
    fn from(view: SampleView) -> Self {
        let sample = view.sample;
        Self {
            id: sample.id().to_string(),
            client: sample.client_ref().clone(),
            state: sample.state().into(),
            history: sample.history().to_vec(),
            selected_analyses: sample.selected_analyses().to_vec(),
            rejection: sample.rejection().cloned(),
            version: sample.version(),
            created_at: *sample.created_at(),
            allowed_transitions: view
                .allowed_transitions
                .into_iter()
                .map(StateResponse::from)
                .collect(),
        }
    }
}
