//! Workflow domain types for Stepwise.
//!
//! Defines the canonical in-memory representation for workflows: an ordered
//! list of typed actions with JSON configuration. This module also contains
//! execution tracking types (`WorkflowRun`, `StepRecord`, `StepLogEntry`)
//! recorded by the engine as a run progresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A declarative workflow definition.
///
/// The single source of truth for a workflow's shape: an identifier, a
/// display name, and the ordered action sequence the engine executes.
/// Structural validity is checked by the validator in stepwise-core, not
/// by construction -- ids here are plain strings so that a missing value
/// (empty string) can be observed and reported instead of panicking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow identifier, unique within the store.
    pub id: String,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered list of actions executed strictly in sequence.
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

/// A single configured action within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// User-defined action ID (e.g. "fetch-orders").
    pub id: String,
    /// Handler type tag resolved against the action registry at run time.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Handler-specific configuration. Arbitrary JSON; `null` means absent.
    #[serde(default)]
    pub config: Value,
    /// Context key the action's output is stored under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Execution Status
// ---------------------------------------------------------------------------

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Status of an individual step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Workflow Run (audit record)
// ---------------------------------------------------------------------------

/// A single execution instance of a workflow.
///
/// Created with status `Running` when the engine starts, and updated exactly
/// once more: to `Completed` with the full step log, or to `Failed` with the
/// partial log and the error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// UUIDv7 run ID (the "execution id" seeded into the context).
    pub id: Uuid,
    /// ID of the workflow definition being executed.
    pub workflow_id: String,
    /// Current run status.
    pub status: RunStatus,
    /// Caller-supplied trigger input, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Value>,
    /// Ordered step log, one entry per attempted action.
    #[serde(default)]
    pub log: Vec<StepLogEntry>,
    /// Error message if the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run completed (None while running).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Execution record for a single action attempt within a run.
///
/// Created with status `Running` immediately before the action's config is
/// resolved, and updated exactly once to its terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// UUIDv7 step record ID (the handle used for the terminal update).
    pub id: Uuid,
    /// Parent workflow run ID.
    pub run_id: Uuid,
    /// Action ID matching `ActionDefinition.id`.
    pub action_id: String,
    /// Action type tag (denormalized for querying).
    pub action_type: String,
    /// Current step status.
    pub status: StepStatus,
    /// The action's raw, pre-substitution config.
    pub input: Value,
    /// Handler result if the step completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error message if the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When step execution started.
    pub started_at: DateTime<Utc>,
    /// When step execution reached its terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Step log
// ---------------------------------------------------------------------------

/// In-memory step log entry mirroring the step record for the run's
/// aggregate log. Appended once per attempted action, in action order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLogEntry {
    /// Action ID of the attempted step.
    pub step: String,
    /// Terminal status of the attempt.
    pub status: StepStatus,
    /// Handler output for completed steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error message for failed steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepLogEntry {
    /// Log entry for a successfully completed action.
    pub fn completed(step: impl Into<String>, output: Value) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Completed,
            output: Some(output),
            error: None,
        }
    }

    /// Log entry for a failed action.
    pub fn failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
