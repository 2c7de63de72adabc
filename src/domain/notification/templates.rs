//! Client-facing wording for state change notifications.

use crate::domain::sample::{SampleState, SampleStateChanged};

const REJECTION_FALLBACK: &str = "Contact the laboratory for more information.";

/// Title shown for a notification about reaching `state`.
pub fn title_for(state: SampleState) -> String {
    match state {
        SampleState::Received => "Sample received".to_string(),
        SampleState::InAnalysis => "Analysis in progress".to_string(),
        SampleState::Finalized => "Results available".to_string(),
        SampleState::Rejected => "Sample rejected".to_string(),
        SampleState::InQuotation => "Quotation in progress".to_string(),
        SampleState::Accepted => "Quotation accepted".to_string(),
        SampleState::PendingResults => format!("Status updated: {}", state),
    }
}

/// Body text for a state change.
pub fn message_for(event: &SampleStateChanged) -> String {
    let id = &event.sample_id;
    match event.new_state {
        SampleState::Received => format!(
            "Your sample {} has been received by the laboratory and is ready for analysis.",
            id
        ),
        SampleState::InAnalysis => format!("Your sample {} is being analyzed by our team.", id),
        SampleState::Finalized => format!(
            "Your results are ready. The analyses for sample {} have been completed.",
            id
        ),
        SampleState::Rejected => {
            let reason = event.observations.trim();
            let reason = if reason.is_empty() { REJECTION_FALLBACK } else { reason };
            format!("Your sample {} has been rejected. {}", id, reason)
        }
        SampleState::InQuotation => format!(
            "Your sample {} is being quoted. You will receive more information soon.",
            id
        ),
        SampleState::Accepted => format!(
            "The quotation for sample {} has been accepted. We will proceed with the analysis.",
            id
        ),
        SampleState::PendingResults => format!(
            "Your sample {} changed from {} to {}.",
            id, event.previous_state, event.new_state
        ),
    }
}
