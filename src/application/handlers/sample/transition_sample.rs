//! SampleStateMachine - validates and commits sample transitions.
//!
//! 1. Load the sample
//! 2. Evaluate the guard table (results are only queried when needed)
//! 3. Commit with a version check; on conflict, reload and re-evaluate
//! 4. Hand audit and notification to the side effect runner
//!
//! The transition result is decided at step 3. Side effects cannot change it.

use std::convert::Infallible;
use std::sync::Arc;

use crate::application::handlers::notification::NotificationDispatcher;
use crate::application::SideEffectRunner;
use crate::domain::audit::AuditRecord;
use crate::domain::foundation::SampleId;
use crate::domain::sample::{Actor, Sample, SampleState, SampleStateChanged, TransitionError};
use crate::ports::{AuditLogger, CommitOutcome, ResultReader, SampleRepository};

/// Command to move a sample to a new state.
#[derive(Debug, Clone)]
pub struct TransitionSampleCommand {
    pub sample_id: SampleId,
    pub target: SampleState,
    pub actor: Actor,
    pub observations: Option<String>,
}

pub struct SampleStateMachine {
    samples: Arc<dyn SampleRepository>,
    results: Arc<dyn ResultReader>,
    audit: Arc<dyn AuditLogger>,
    dispatcher: Arc<NotificationDispatcher>,
    side_effects: Arc<SideEffectRunner>,
    max_commit_attempts: u32,
}

impl SampleStateMachine {
    pub fn new(
        samples: Arc<dyn SampleRepository>,
        results: Arc<dyn ResultReader>,
        audit: Arc<dyn AuditLogger>,
        dispatcher: Arc<NotificationDispatcher>,
        side_effects: Arc<SideEffectRunner>,
    ) -> Self {
        Self {
            samples,
            results,
            audit,
            dispatcher,
            side_effects,
            max_commit_attempts: 3,
        }
    }

    /// How many times a version conflict is retried before giving up.
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    /// Transitions a sample and returns it as committed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the sample does not exist
    /// - `InvalidTransition` if the target can never be requested
    /// - `Precondition` if a guard fails
    /// - `Conflict` if every commit attempt lost a version race
    /// - `Persistence` on storage failure
    pub async fn transition(&self, cmd: TransitionSampleCommand) -> Result<Sample, TransitionError> {
        for attempt in 1..=self.max_commit_attempts {
            let sample = self
                .samples
                .find_by_id(&cmd.sample_id)
                .await?
                .ok_or_else(|| TransitionError::NotFound(cmd.sample_id.clone()))?;

            let has_results = if cmd.target.requires_results() {
                Some(self.results.has_results(&cmd.sample_id).await?)
            } else {
                None
            };

            let commit = sample.plan_transition(
                cmd.target,
                cmd.actor.clone(),
                cmd.observations.as_deref(),
                has_results,
            )?;

            match self.samples.commit_transition(&commit).await? {
                CommitOutcome::Committed(committed) => {
                    tracing::info!(
                        sample_id = %committed.id(),
                        from = sample.state().as_str(),
                        to = committed.state().as_str(),
                        actor = %cmd.actor.id,
                        "sample transitioned"
                    );
                    self.after_commit(&committed);
                    return Ok(committed);
                }
                CommitOutcome::VersionConflict => {
                    tracing::debug!(
                        sample_id = %cmd.sample_id,
                        attempt,
                        "version conflict on sample commit"
                    );
                }
                CommitOutcome::NotFound => {
                    return Err(TransitionError::NotFound(cmd.sample_id));
                }
            }
        }

        tracing::warn!(
            sample_id = %cmd.sample_id,
            attempts = self.max_commit_attempts,
            "giving up on sample transition after repeated conflicts"
        );
        Err(TransitionError::Conflict(cmd.sample_id))
    }

    fn after_commit(&self, sample: &Sample) {
        let Some(event) = SampleStateChanged::from_committed(sample) else {
            return;
        };

        let audit = Arc::clone(&self.audit);
        let record = AuditRecord::for_transition(&event);
        self.side_effects
            .submit("audit", async move { audit.append(record).await });

        let dispatcher = Arc::clone(&self.dispatcher);
        self.side_effects.submit("notify", async move {
            dispatcher.dispatch(event).await;
            Ok::<_, Infallible>(())
        });
    }
}
