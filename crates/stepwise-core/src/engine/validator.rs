//! Structural validation of workflow definitions.
//!
//! Validation is advisory: it reports every structural defect it finds as a
//! human-readable list instead of failing on the first one, and it never
//! aborts anything by itself. The executor assumes callers validated first.

use serde::Serialize;
use stepwise_types::workflow::WorkflowDefinition;

// ---------------------------------------------------------------------------
// ValidationReport
// ---------------------------------------------------------------------------

/// Outcome of validating a workflow definition.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// True iff no errors were found.
    pub valid: bool,
    /// All collected validation errors, workflow-level first.
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a workflow definition.
///
/// Checks, each evaluated independently (failures are collected, not
/// short-circuited):
/// - workflow id and name are non-empty
/// - the action sequence is non-empty
/// - every action has a non-empty id, a non-empty type, and a non-null config
/// - an action's output key, when present, is non-empty
pub fn validate(workflow: &WorkflowDefinition) -> ValidationReport {
    let mut errors = Vec::new();

    if workflow.id.is_empty() {
        errors.push("Workflow must have an id".to_string());
    }
    if workflow.name.is_empty() {
        errors.push("Workflow must have a name".to_string());
    }
    if workflow.actions.is_empty() {
        errors.push("Workflow must have an actions array".to_string());
    }

    for (i, action) in workflow.actions.iter().enumerate() {
        if action.id.is_empty() {
            errors.push(format!("Action {i} must have an id"));
        }
        if action.action_type.is_empty() {
            errors.push(format!("Action {i} must have a type"));
        }
        if action.config.is_null() {
            errors.push(format!("Action {i} must have config"));
        }
        if let Some(key) = &action.output_key {
            if key.is_empty() {
                errors.push(format!("Action {i} output key must be a non-empty string"));
            }
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
