//! Append-only audit trail entries.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::sample::SampleStateChanged;

/// One audit log line. Written by the core, never read back by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor: UserId,
    pub action: String,
    pub details: JsonValue,
    pub timestamp: Timestamp,
}

impl AuditRecord {
    pub const SAMPLE_STATE_CHANGED: &'static str = "sample.state_changed";

    pub fn for_transition(event: &SampleStateChanged) -> Self {
        Self {
            actor: event.actor.id.clone(),
            action: Self::SAMPLE_STATE_CHANGED.to_string(),
            details: serde_json::json!({
                "sample_id": event.sample_id,
                "actor_name": event.actor.name,
                "previous_state": event.previous_state,
                "new_state": event.new_state,
                "observations": event.observations,
            }),
            timestamp: event.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ClientId, ClientRef, SampleId};
    use crate::domain::sample::{Actor, SampleState};

    #[test]
    fn transition_record_captures_states() {
        let client = ClientRef::ById(ClientId::new("c-1").unwrap());
        let event = SampleStateChanged {
            sample_id: SampleId::new("S-9").unwrap(),
            client: client.clone(),
            client_refs: vec![client],
            previous_state: SampleState::Received,
            new_state: SampleState::InAnalysis,
            observations: "started".into(),
            actor: Actor {
                id: UserId::new("lab-2").unwrap(),
                name: "Luis".into(),
                document: None,
            },
            occurred_at: Timestamp::now(),
        };
        let record = AuditRecord::for_transition(&event);
        assert_eq!(record.actor.as_str(), "lab-2");
        assert_eq!(record.details["previous_state"], "received");
        assert_eq!(record.details["new_state"], "in_analysis");
        assert_eq!(record.details["sample_id"], "S-9");
    }
}
