//! Execution context: the mutable state that flows through a workflow run.
//!
//! `ExecutionContext` is an insertion-ordered mapping from string keys to
//! arbitrary JSON values. It is seeded once at run start and extended by
//! action outputs; entries are only ever added or overwritten, never removed.
//! Each run owns its context exclusively -- nothing is shared across runs.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use stepwise_types::workflow::WorkflowDefinition;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// The accumulating evaluation context for one workflow run.
///
/// Seeded with `trigger`, `workflow`, `now`, and `executionId`, then extended
/// with each action's output under its declared output key. Output keys may
/// overwrite anything, including the seeded entries -- that shadowing is
/// sanctioned, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    values: Map<String, Value>,
}

impl ExecutionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the seeded context for a run.
    ///
    /// `now` is fixed to the run's start timestamp and never re-evaluated
    /// per step.
    pub fn seed(
        definition: &WorkflowDefinition,
        execution_id: Uuid,
        trigger: Option<Value>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut ctx = Self::new();
        ctx.insert("trigger", trigger.unwrap_or_else(|| json!({})));
        ctx.insert(
            "workflow",
            json!({ "id": definition.id, "name": definition.name }),
        );
        ctx.insert("now", Value::String(started_at.to_rfc3339()));
        ctx.insert("executionId", Value::String(execution_id.to_string()));
        ctx
    }

    /// Insert or overwrite a top-level entry.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Get a top-level entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Walk a dot-separated path against the context.
    ///
    /// The first segment indexes the context map; every further segment
    /// indexes a nested JSON object. Returns `None` for an empty path, a
    /// missing segment, or a traversal into a non-object -- the resolver
    /// treats all three as "leave the reference verbatim".
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        if first.is_empty() {
            return None;
        }
        let mut current = self.values.get(first)?;
        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the underlying map.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Consume the context, returning the underlying map.
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

impl From<Map<String, Value>> for ExecutionContext {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
