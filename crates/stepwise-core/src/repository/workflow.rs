//! Workflow repository trait definition.
//!
//! Defines the storage interface for workflow definitions, execution runs,
//! and step records. The infrastructure layer (stepwise-infra) implements
//! this trait with SQLite and in-memory backends.

use chrono::{DateTime, Utc};
use stepwise_types::error::RepositoryError;
use stepwise_types::workflow::{
    RunStatus, StepLogEntry, StepRecord, StepStatus, WorkflowDefinition, WorkflowRun,
};
use uuid::Uuid;

/// Repository trait for workflow persistence.
///
/// Covers three entity families:
/// - **Definitions:** CRUD for workflow definitions.
/// - **Runs:** Create/update/query workflow execution instances.
/// - **Steps:** Create/update/query individual step records.
///
/// Every operation is awaited to completion before the engine depends on its
/// effect, so implementations must be durable by the time they return.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Upsert a workflow definition (insert or replace by ID).
    fn save_definition(
        &self,
        def: &WorkflowDefinition,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a workflow definition by its ID.
    fn get_definition(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowDefinition>, RepositoryError>> + Send;

    /// List all workflow definitions, ordered by name.
    fn list_definitions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowDefinition>, RepositoryError>> + Send;

    /// Delete a workflow definition by ID. Returns `true` if it existed.
    fn delete_definition(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    /// Create a new workflow run record (status `Running`).
    fn create_run(
        &self,
        run: &WorkflowRun,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Update a run to its terminal status with the aggregate step log,
    /// the error message for failed runs, and the completion timestamp.
    fn update_run(
        &self,
        run_id: &Uuid,
        status: RunStatus,
        log: &[StepLogEntry],
        error: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a workflow run by its UUID.
    fn get_run(
        &self,
        run_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowRun>, RepositoryError>> + Send;

    /// List runs for a given workflow definition, most recent first.
    fn list_runs(
        &self,
        workflow_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowRun>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    /// Create a new step record (status `Running`).
    fn create_step(
        &self,
        record: &StepRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Update a step record to its terminal status with output or error.
    fn update_step(
        &self,
        step_id: &Uuid,
        status: StepStatus,
        output: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List all step records for a given run, in execution order.
    fn list_steps(
        &self,
        run_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<StepRecord>, RepositoryError>> + Send;
}
