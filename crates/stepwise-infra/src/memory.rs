//! In-memory workflow repository.
//!
//! DashMap-backed implementation of `WorkflowRepository` for tests and for
//! embedders that do not need durability. Concurrent runs only ever touch
//! entries keyed by their own run id, so the concurrent map is all the
//! coordination required.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use stepwise_core::repository::workflow::WorkflowRepository;
use stepwise_types::error::RepositoryError;
use stepwise_types::workflow::{
    RunStatus, StepLogEntry, StepRecord, StepStatus, WorkflowDefinition, WorkflowRun,
};
use uuid::Uuid;

/// Non-durable `WorkflowRepository` holding everything in process memory.
#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    definitions: DashMap<String, WorkflowDefinition>,
    runs: DashMap<Uuid, WorkflowRun>,
    /// Step records per run, in creation order.
    steps: DashMap<Uuid, Vec<StepRecord>>,
}

impl InMemoryWorkflowRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn save_definition(&self, def: &WorkflowDefinition) -> Result<(), RepositoryError> {
        self.definitions.insert(def.id.clone(), def.clone());
        Ok(())
    }

    async fn get_definition(&self, id: &str) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        Ok(self.definitions.get(id).map(|entry| entry.clone()))
    }

    async fn list_definitions(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        let mut defs: Vec<WorkflowDefinition> = self
            .definitions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(defs)
    }

    async fn delete_definition(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.definitions.remove(id).is_some())
    }

    async fn create_run(&self, run: &WorkflowRun) -> Result<(), RepositoryError> {
        self.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn update_run(
        &self,
        run_id: &Uuid,
        status: RunStatus,
        log: &[StepLogEntry],
        error: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut run = self.runs.get_mut(run_id).ok_or(RepositoryError::NotFound)?;
        run.status = status;
        run.log = log.to_vec();
        run.error = error.map(String::from);
        run.completed_at = Some(completed_at);
        Ok(())
    }

    async fn get_run(&self, run_id: &Uuid) -> Result<Option<WorkflowRun>, RepositoryError> {
        Ok(self.runs.get(run_id).map(|entry| entry.clone()))
    }

    async fn list_runs(
        &self,
        workflow_id: &str,
        limit: u32,
    ) -> Result<Vec<WorkflowRun>, RepositoryError> {
        let mut runs: Vec<WorkflowRun> = self
            .runs
            .iter()
            .filter(|entry| entry.workflow_id == workflow_id)
            .map(|entry| entry.value().clone())
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit as usize);
        Ok(runs)
    }

    async fn create_step(&self, record: &StepRecord) -> Result<(), RepositoryError> {
        self.steps
            .entry(record.run_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn update_step(
        &self,
        step_id: &Uuid,
        status: StepStatus,
        output: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        for mut entry in self.steps.iter_mut() {
            if let Some(step) = entry.value_mut().iter_mut().find(|s| s.id == *step_id) {
                step.status = status;
                step.output = output.cloned();
                step.error = error.map(String::from);
                step.completed_at = Some(Utc::now());
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound)
    }

    async fn list_steps(&self, run_id: &Uuid) -> Result<Vec<StepRecord>, RepositoryError> {
        Ok(self
            .steps
            .get(run_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
