//! Sample domain events.

use serde::{Deserialize, Serialize};

use super::{Actor, Sample, SampleState};
use crate::domain::foundation::{ClientRef, SampleId, Timestamp};

/// Published after a transition has been committed.
///
/// Carries everything the notification pipeline needs so that no further
/// lookups of the sample are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStateChanged {
    pub sample_id: SampleId,
    pub client: ClientRef,
    /// Every reference the owner can be addressed by, `client` first.
    pub client_refs: Vec<ClientRef>,
    pub previous_state: SampleState,
    pub new_state: SampleState,
    pub observations: String,
    pub actor: Actor,
    pub occurred_at: Timestamp,
}

impl SampleStateChanged {
    pub const EVENT_TYPE: &'static str = "sample.state_changed";

    /// Builds the event from a sample right after its last commit.
    ///
    /// Returns `None` for a sample that has never transitioned.
    pub fn from_committed(sample: &Sample) -> Option<Self> {
        let entry = sample.history().last()?;
        let previous_state = entry.previous_state?;
        Some(Self {
            sample_id: sample.id().clone(),
            client: sample.client_ref().clone(),
            client_refs: sample.owner().refs(),
            previous_state,
            new_state: entry.state,
            observations: entry.observations.clone(),
            actor: entry.actor.clone(),
            occurred_at: entry.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ClientId, UserId};
    use crate::domain::sample::SampleOwner;

    fn actor() -> Actor {
        Actor {
            id: UserId::new("lab-1").unwrap(),
            name: "Ana".into(),
            document: None,
        }
    }

    #[test]
    fn fresh_sample_has_no_event() {
        let sample = Sample::register(
            SampleId::new("S-1").unwrap(),
            SampleOwner::new(Some(ClientId::new("c-1").unwrap()), None).unwrap(),
            vec![],
            actor(),
        );
        assert!(SampleStateChanged::from_committed(&sample).is_none());
    }

    #[test]
    fn event_mirrors_last_entry() {
        let mut sample = Sample::register(
            SampleId::new("S-1").unwrap(),
            SampleOwner::new(None, Some("900".into())).unwrap(),
            vec![],
            actor(),
        );
        let commit = sample
            .plan_transition(SampleState::InAnalysis, actor(), Some("started"), None)
            .unwrap();
        sample.apply(&commit).unwrap();

        let event = SampleStateChanged::from_committed(&sample).unwrap();
        assert_eq!(event.previous_state, SampleState::Received);
        assert_eq!(event.new_state, SampleState::InAnalysis);
        assert_eq!(event.observations, "started");
        assert_eq!(event.client, ClientRef::ByDocument("900".into()));
    }
}
