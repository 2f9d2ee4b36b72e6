//! Sequential workflow executor.
//!
//! `WorkflowEngine` runs a workflow's actions strictly in definition order,
//! resolving each action's config against the accumulated context,
//! dispatching to the registered handler, and recording every run/step
//! transition before moving on. One failing step terminates the run
//! (fail-fast); no retry, no skipping, no parallelism.
//!
//! # Execution flow
//!
//! 1. Generate a run id, seed the context, persist the run as `Running`.
//! 2. Per action: persist a `Running` step record with the raw config,
//!    resolve the config, dispatch by type tag, persist the terminal step
//!    status, extend the context via the action's output key.
//! 3. Persist the run as `Completed` with the full log, or as `Failed` with
//!    the partial log and the first error, then return the result.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use stepwise_types::error::RepositoryError;
use stepwise_types::workflow::{RunStatus, StepLogEntry, WorkflowDefinition, WorkflowRun};
use uuid::Uuid;

use crate::repository::workflow::WorkflowRepository;

use super::context::ExecutionContext;
use super::recorder::RunRecorder;
use super::registry::{ActionError, ActionRegistry};
use super::resolver;

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// Result of a workflow execution, success or failure.
///
/// Workflow-logic failures are reported here, never as an `Err` from
/// [`WorkflowEngine::execute`]; the `Err` arm is reserved for repository
/// failures, which sit outside the run/step state machine.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Whether every action completed.
    pub success: bool,
    /// The run ID.
    pub execution_id: Uuid,
    /// Ordered step log, one entry per attempted action.
    pub log: Vec<StepLogEntry>,
    /// Final evaluation context. Only returned for successful runs.
    pub context: Option<Map<String, Value>>,
    /// The failing step's error message, if the run failed.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Infrastructure errors escaping a workflow execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The persistence collaborator failed. Not part of the workflow state
    /// machine: the run record is left as-is, since the store itself is
    /// what broke.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Sequential, fail-fast workflow executor.
///
/// Generic over `R: WorkflowRepository` for storage flexibility. Handlers
/// are looked up by action type tag in the shared [`ActionRegistry`].
///
/// `execute` assumes a structurally valid workflow; callers run the
/// validator first. Distinct runs are independent: each owns its context
/// and log, and the repository is the only shared resource.
pub struct WorkflowEngine<R: WorkflowRepository> {
    recorder: RunRecorder<R>,
    registry: Arc<ActionRegistry>,
}

impl<R: WorkflowRepository> WorkflowEngine<R> {
    /// Create a new engine over a repository and a handler registry.
    pub fn new(repo: R, registry: Arc<ActionRegistry>) -> Self {
        Self {
            recorder: RunRecorder::new(repo),
            registry,
        }
    }

    /// Access the underlying repository.
    pub fn repository(&self) -> &R {
        self.recorder.repo()
    }

    /// Execute a workflow against the given trigger input.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        trigger: Option<Value>,
    ) -> Result<ExecutionResult, EngineError> {
        let execution_id = Uuid::now_v7();
        let started_at = Utc::now();
        let mut ctx = ExecutionContext::seed(definition, execution_id, trigger.clone(), started_at);

        let run = WorkflowRun {
            id: execution_id,
            workflow_id: definition.id.clone(),
            status: RunStatus::Running,
            trigger,
            log: Vec::new(),
            error: None,
            started_at,
            completed_at: None,
        };
        self.recorder.record_run_start(&run).await?;

        tracing::info!(
            execution_id = %execution_id,
            workflow = definition.id.as_str(),
            actions = definition.actions.len(),
            "starting workflow execution"
        );

        let mut log: Vec<StepLogEntry> = Vec::with_capacity(definition.actions.len());

        for action in &definition.actions {
            let step_id = self.recorder.record_step_start(execution_id, action).await?;
            let resolved = resolver::resolve(&action.config, &ctx);

            let outcome = match self.registry.lookup(&action.action_type) {
                Some(handler) => handler.execute(resolved).await,
                None => Err(ActionError::UnknownType(action.action_type.clone())),
            };

            match outcome {
                Ok(output) => {
                    self.recorder.record_step_completed(step_id, &output).await?;
                    if let Some(key) = &action.output_key {
                        ctx.insert(key.clone(), output.clone());
                    }
                    log.push(StepLogEntry::completed(action.id.clone(), output));
                }
                Err(err) => {
                    let message = err.to_string();
                    self.recorder.record_step_failed(step_id, &message).await?;
                    log.push(StepLogEntry::failed(action.id.clone(), message.clone()));
                    self.recorder
                        .record_run_failed(execution_id, &log, &message)
                        .await?;

                    tracing::warn!(
                        execution_id = %execution_id,
                        action_id = action.id.as_str(),
                        error = message.as_str(),
                        "workflow execution failed"
                    );

                    return Ok(ExecutionResult {
                        success: false,
                        execution_id,
                        log,
                        context: None,
                        error: Some(message),
                    });
                }
            }
        }

        self.recorder.record_run_completed(execution_id, &log).await?;

        tracing::info!(
            execution_id = %execution_id,
            steps = log.len(),
            "workflow execution completed"
        );

        Ok(ExecutionResult {
            success: true,
            execution_id,
            log,
            context: Some(ctx.into_values()),
            error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
