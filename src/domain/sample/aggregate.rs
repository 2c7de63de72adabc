//! Sample aggregate.
//!
//! A sample's state is never assigned directly. Every change appends a
//! [`TransitionEntry`] and moves `state` in the same step, so the current
//! state always equals the state of the last history entry.
//!
//! # Invariants
//!
//! - `history` is non-empty and append-only
//! - `state == history.last().state`
//! - `version` increases by exactly one per committed transition

use serde::{Deserialize, Serialize};

use super::{Guard, GuardContext, SampleState, TransitionError};
use crate::domain::foundation::{
    AuthenticatedUser, ClientId, ClientRef, DomainError, ErrorCode, SampleId, Timestamp, UserId,
    ValidationError,
};

/// Who performed a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub name: String,
    pub document: Option<String>,
}

impl From<&AuthenticatedUser> for Actor {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            document: user.document.clone(),
        }
    }
}

/// One row of the append-only state history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub state: SampleState,
    pub previous_state: Option<SampleState>,
    pub timestamp: Timestamp,
    pub actor: Actor,
    pub observations: String,
}

/// Recorded when a sample is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
    pub rejected_at: Timestamp,
}

/// The client a sample belongs to.
///
/// Resolved to a [`ClientRef`] once, on construction: an account id wins,
/// otherwise the document number written on the intake form is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleOwner {
    client_ref: ClientRef,
    document: Option<String>,
}

impl SampleOwner {
    pub fn new(
        client_id: Option<ClientId>,
        document: Option<String>,
    ) -> Result<Self, ValidationError> {
        let document = document.filter(|d| !d.trim().is_empty());
        let client_ref = match (client_id, document.as_ref()) {
            (Some(id), _) => ClientRef::ById(id),
            (None, Some(doc)) => ClientRef::ByDocument(doc.clone()),
            (None, None) => return Err(ValidationError::empty_field("client")),
        };
        Ok(Self {
            client_ref,
            document,
        })
    }

    pub fn client_ref(&self) -> &ClientRef {
        &self.client_ref
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Every reference the owner can be reached under.
    pub fn refs(&self) -> Vec<ClientRef> {
        let mut refs = vec![self.client_ref.clone()];
        if let Some(doc) = &self.document {
            let by_doc = ClientRef::ByDocument(doc.clone());
            if by_doc != self.client_ref {
                refs.push(by_doc);
            }
        }
        refs
    }
}

/// A transition that passed its guards and is ready to be committed.
///
/// Repositories apply it only if the stored version still equals
/// `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommit {
    pub sample_id: SampleId,
    pub expected_version: u64,
    pub entry: TransitionEntry,
    pub rejection: Option<Rejection>,
}

/// Sample aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    id: SampleId,
    owner: SampleOwner,
    state: SampleState,
    history: Vec<TransitionEntry>,
    selected_analyses: Vec<String>,
    rejection: Option<Rejection>,
    version: u64,
    created_at: Timestamp,
}

impl Sample {
    /// Registers a freshly received sample with a single history entry.
    pub fn register(
        id: SampleId,
        owner: SampleOwner,
        selected_analyses: Vec<String>,
        received_by: Actor,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            owner,
            state: SampleState::Received,
            history: vec![TransitionEntry {
                state: SampleState::Received,
                previous_state: None,
                timestamp: now,
                actor: received_by,
                observations: "Sample received".to_string(),
            }],
            selected_analyses,
            rejection: None,
            version: 0,
            created_at: now,
        }
    }

    /// Rebuilds a sample from storage, checking the history invariant.
    pub fn reconstitute(
        id: SampleId,
        owner: SampleOwner,
        history: Vec<TransitionEntry>,
        selected_analyses: Vec<String>,
        rejection: Option<Rejection>,
        version: u64,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let state = history.last().map(|entry| entry.state).ok_or_else(|| {
            DomainError::new(ErrorCode::InternalError, "Stored sample has empty history")
                .with_detail("sample_id", id.as_str())
        })?;
        Ok(Self {
            id,
            owner,
            state,
            history,
            selected_analyses,
            rejection,
            version,
            created_at,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SampleId {
        &self.id
    }

    pub fn owner(&self) -> &SampleOwner {
        &self.owner
    }

    pub fn client_ref(&self) -> &ClientRef {
        self.owner.client_ref()
    }

    pub fn state(&self) -> SampleState {
        self.state
    }

    pub fn history(&self) -> &[TransitionEntry] {
        &self.history
    }

    pub fn selected_analyses(&self) -> &[String] {
        &self.selected_analyses
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates the guard table and, if every guard passes, returns the
    /// commit that would move the sample to `target`.
    ///
    /// `has_results` must be `Some` whenever `target.requires_results()`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if `target` has no guard row
    /// - `Precondition` naming the first unmet guard
    pub fn plan_transition(
        &self,
        target: SampleState,
        actor: Actor,
        observations: Option<&str>,
        has_results: Option<bool>,
    ) -> Result<TransitionCommit, TransitionError> {
        let guards: &[Guard] =
            target
                .entry_guards()
                .ok_or(TransitionError::InvalidTransition {
                    from: self.state,
                    to: target,
                })?;

        let observations = observations.map(str::trim).filter(|o| !o.is_empty());
        let ctx = GuardContext {
            current: self.state,
            has_results,
            selected_analyses: self.selected_analyses.len(),
            observations,
        };
        for guard in guards {
            guard.check(&ctx).map_err(TransitionError::Precondition)?;
        }

        let now = Timestamp::now();
        let text = observations.map(str::to_string).unwrap_or_else(|| {
            format!("State changed from {} to {}", self.state, target)
        });
        let rejection = (target == SampleState::Rejected).then(|| Rejection {
            reason: text.clone(),
            rejected_at: now,
        });

        Ok(TransitionCommit {
            sample_id: self.id.clone(),
            expected_version: self.version,
            entry: TransitionEntry {
                state: target,
                previous_state: Some(self.state),
                timestamp: now,
                actor,
                observations: text,
            },
            rejection,
        })
    }

    /// Applies a planned commit if the version still matches.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the sample moved on since the commit was planned
    pub fn apply(&mut self, commit: &TransitionCommit) -> Result<(), TransitionError> {
        if commit.sample_id != self.id || commit.expected_version != self.version {
            return Err(TransitionError::Conflict(self.id.clone()));
        }
        self.history.push(commit.entry.clone());
        self.state = commit.entry.state;
        if let Some(rejection) = &commit.rejection {
            self.rejection = Some(rejection.clone());
        }
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::UnmetCondition;

    fn actor() -> Actor {
        Actor {
            id: UserId::new("lab-1").unwrap(),
            name: "Ana Ruiz".to_string(),
            document: Some("1010".to_string()),
        }
    }

    fn sample(analyses: &[&str]) -> Sample {
        Sample::register(
            SampleId::new("S-1").unwrap(),
            SampleOwner::new(Some(ClientId::new("c-1").unwrap()), Some("900".into())).unwrap(),
            analyses.iter().map(|a| a.to_string()).collect(),
            actor(),
        )
    }

    fn advance(sample: &mut Sample, target: SampleState, obs: Option<&str>, results: bool) {
        let commit = sample
            .plan_transition(target, actor(), obs, Some(results))
            .unwrap();
        sample.apply(&commit).unwrap();
    }

    // Construction

    #[test]
    fn registered_sample_has_single_received_entry() {
        let s = sample(&["ph"]);
        assert_eq!(s.state(), SampleState::Received);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history()[0].previous_state, None);
        assert_eq!(s.version(), 0);
    }

    #[test]
    fn owner_requires_id_or_document() {
        assert!(SampleOwner::new(None, None).is_err());
        assert!(SampleOwner::new(None, Some("  ".into())).is_err());
        let by_doc = SampleOwner::new(None, Some("77".into())).unwrap();
        assert_eq!(by_doc.client_ref(), &ClientRef::ByDocument("77".into()));
        assert_eq!(by_doc.refs().len(), 1);
    }

    #[test]
    fn owner_refs_cover_id_and_document() {
        let s = sample(&[]);
        assert_eq!(s.owner().refs().len(), 2);
    }

    #[test]
    fn reconstitute_rejects_empty_history() {
        let result = Sample::reconstitute(
            SampleId::new("S-2").unwrap(),
            SampleOwner::new(None, Some("1".into())).unwrap(),
            vec![],
            vec![],
            None,
            0,
            Timestamp::now(),
        );
        assert!(result.is_err());
    }

    // Guards

    #[test]
    fn received_to_in_analysis_appends_history() {
        let mut s = sample(&["ph"]);
        advance(&mut s, SampleState::InAnalysis, None, false);

        assert_eq!(s.state(), SampleState::InAnalysis);
        assert_eq!(s.history().len(), 2);
        let last = s.history().last().unwrap();
        assert_eq!(last.previous_state, Some(SampleState::Received));
        assert_eq!(last.observations, "State changed from Received to In analysis");
        assert_eq!(s.version(), 1);
    }

    #[test]
    fn finalize_from_in_analysis_without_results_fails() {
        let mut s = sample(&["ph"]);
        advance(&mut s, SampleState::InAnalysis, None, false);
        let err = s
            .plan_transition(SampleState::Finalized, actor(), None, Some(false))
            .unwrap_err();
        assert_eq!(err, TransitionError::Precondition(UnmetCondition::NoResults));
    }

    #[test]
    fn finalize_from_received_fails_even_with_results() {
        let s = sample(&["ph"]);
        let err = s
            .plan_transition(SampleState::Finalized, actor(), None, Some(true))
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::Precondition(UnmetCondition::NotInState { .. })
        ));
    }

    #[test]
    fn quotation_requires_selected_analyses() {
        let err = sample(&[])
            .plan_transition(SampleState::InQuotation, actor(), None, None)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Precondition(UnmetCondition::NoSelectedAnalyses)
        );
    }

    #[test]
    fn accepted_only_from_quotation() {
        let mut s = sample(&["ph"]);
        assert!(s
            .plan_transition(SampleState::Accepted, actor(), None, None)
            .is_err());
        advance(&mut s, SampleState::InQuotation, None, false);
        advance(&mut s, SampleState::Accepted, None, false);
        advance(&mut s, SampleState::Received, None, false);
        assert_eq!(s.state(), SampleState::Received);
        assert_eq!(s.history().len(), 4);
    }

    #[test]
    fn rejection_records_reason() {
        let mut s = sample(&["ph"]);
        advance(&mut s, SampleState::Rejected, Some("  broken seal "), false);
        let rejection = s.rejection().unwrap();
        assert_eq!(rejection.reason, "broken seal");
        assert_eq!(s.history().last().unwrap().observations, "broken seal");
    }

    #[test]
    fn rejection_without_observations_fails() {
        let err = sample(&["ph"])
            .plan_transition(SampleState::Rejected, actor(), Some(""), None)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Precondition(UnmetCondition::MissingObservations)
        );
    }

    #[test]
    fn pending_results_target_is_invalid() {
        let err = sample(&["ph"])
            .plan_transition(SampleState::PendingResults, actor(), None, None)
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    // Commit

    #[test]
    fn stale_commit_is_a_conflict() {
        let mut s = sample(&["ph"]);
        let first = s
            .plan_transition(SampleState::InAnalysis, actor(), None, None)
            .unwrap();
        let second = s
            .plan_transition(SampleState::Rejected, actor(), Some("spilled"), None)
            .unwrap();
        s.apply(&first).unwrap();
        assert!(matches!(s.apply(&second), Err(TransitionError::Conflict(_))));
        assert_eq!(s.state(), SampleState::InAnalysis);
    }

    #[test]
    fn state_always_matches_last_history_entry() {
        let mut s = sample(&["ph"]);
        let path = [
            (SampleState::InAnalysis, None),
            (SampleState::Rejected, Some("contaminated")),
            (SampleState::InQuotation, None),
            (SampleState::Accepted, None),
            (SampleState::Received, None),
        ];
        for (target, obs) in path {
            advance(&mut s, target, obs, false);
            assert_eq!(s.state(), s.history().last().unwrap().state);
        }
        assert_eq!(s.version(), 5);
    }
}
