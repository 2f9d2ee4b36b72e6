//! Run and step transition persistence.
//!
//! `RunRecorder` wraps a [`WorkflowRepository`] with the engine-facing write
//! operations. Each transition is persisted before the executor moves
//! forward, so the stored records never lag the in-memory state machine.

use chrono::Utc;
use serde_json::Value;
use stepwise_types::error::RepositoryError;
use stepwise_types::workflow::{
    ActionDefinition, RunStatus, StepLogEntry, StepRecord, StepStatus, WorkflowRun,
};
use uuid::Uuid;

use crate::repository::workflow::WorkflowRepository;

// ---------------------------------------------------------------------------
// RunRecorder
// ---------------------------------------------------------------------------

/// Persists run and step state transitions for the executor.
///
/// Generic over `R: WorkflowRepository` so it works with any storage backend
/// (SQLite, in-memory, etc.).
pub struct RunRecorder<R: WorkflowRepository> {
    repo: R,
}

impl<R: WorkflowRepository> RunRecorder<R> {
    /// Create a new recorder backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Run-level transitions
    // -----------------------------------------------------------------------

    /// Persist the freshly created run record (status `Running`).
    pub async fn record_run_start(&self, run: &WorkflowRun) -> Result<(), RepositoryError> {
        self.repo.create_run(run).await?;
        tracing::debug!(run_id = %run.id, workflow = run.workflow_id.as_str(), "recorded run start");
        Ok(())
    }

    /// Persist the run as completed with its full step log.
    pub async fn record_run_completed(
        &self,
        run_id: Uuid,
        log: &[StepLogEntry],
    ) -> Result<(), RepositoryError> {
        self.repo
            .update_run(&run_id, RunStatus::Completed, log, None, Utc::now())
            .await?;
        tracing::debug!(run_id = %run_id, steps = log.len(), "recorded run completed");
        Ok(())
    }

    /// Persist the run as failed with the partial log and error message.
    pub async fn record_run_failed(
        &self,
        run_id: Uuid,
        log: &[StepLogEntry],
        error: &str,
    ) -> Result<(), RepositoryError> {
        self.repo
            .update_run(&run_id, RunStatus::Failed, log, Some(error), Utc::now())
            .await?;
        tracing::debug!(run_id = %run_id, error, "recorded run failed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Step-level transitions
    // -----------------------------------------------------------------------

    /// Persist a new step record (status `Running`) with the action's raw,
    /// pre-substitution config as input. Returns the record's id, the handle
    /// for the terminal update.
    pub async fn record_step_start(
        &self,
        run_id: Uuid,
        action: &ActionDefinition,
    ) -> Result<Uuid, RepositoryError> {
        let record = StepRecord {
            id: Uuid::now_v7(),
            run_id,
            action_id: action.id.clone(),
            action_type: action.action_type.clone(),
            status: StepStatus::Running,
            input: action.config.clone(),
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };

        self.repo.create_step(&record).await?;
        tracing::debug!(
            run_id = %run_id,
            action_id = action.id.as_str(),
            step_id = %record.id,
            "recorded step start"
        );
        Ok(record.id)
    }

    /// Persist a step as completed with the handler's output.
    pub async fn record_step_completed(
        &self,
        step_id: Uuid,
        output: &Value,
    ) -> Result<(), RepositoryError> {
        self.repo
            .update_step(&step_id, StepStatus::Completed, Some(output), None)
            .await?;
        tracing::debug!(step_id = %step_id, "recorded step completed");
        Ok(())
    }

    /// Persist a step as failed with the error message.
    pub async fn record_step_failed(
        &self,
        step_id: Uuid,
        error: &str,
    ) -> Result<(), RepositoryError> {
        self.repo
            .update_step(&step_id, StepStatus::Failed, None, Some(error))
            .await?;
        tracing::debug!(step_id = %step_id, error, "recorded step failed");
        Ok(())
    }
}
