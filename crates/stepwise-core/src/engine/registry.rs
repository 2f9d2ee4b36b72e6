//! Action handler capability and type-tag registry.
//!
//! Actions name their implementation by a string type tag; the registry maps
//! each tag to a polymorphic [`ActionHandler`]. Registration is runtime
//! configuration -- the engine itself ships no handlers. Concrete
//! implementations live in stepwise-infra (HTTP, log, delay, echo) or in
//! the embedding application.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ActionError
// ---------------------------------------------------------------------------

/// Errors produced by action dispatch and execution.
///
/// Any variant aborts the run; the variants exist so that the recorded
/// messages are distinguishable.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No handler is registered for the action's type tag.
    #[error("Unknown action type: {0}")]
    UnknownType(String),

    /// The resolved config did not match what the handler expects.
    #[error("invalid action config: {0}")]
    InvalidConfig(String),

    /// The handler ran and failed. The message is recorded verbatim into
    /// the step record and the run's error field.
    #[error("{0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// ActionHandler
// ---------------------------------------------------------------------------

/// A pluggable implementation for one action type.
///
/// Single-method capability: the handler receives the action's resolved
/// config and produces a JSON result (persisted, and re-substitutable into
/// later steps' configs) or an error. Dyn-compatible via a boxed future,
/// so handlers can be stored behind `Arc<dyn ActionHandler>` in a registry.
pub trait ActionHandler: Send + Sync {
    /// Execute the action with its resolved configuration.
    fn execute(
        &self,
        config: Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Value, ActionError>> + Send + '_>,
    >;
}

// ---------------------------------------------------------------------------
// ActionRegistry
// ---------------------------------------------------------------------------

/// Registry mapping action type tags to their handlers.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a type tag, replacing any previous handler
    /// for that tag.
    pub fn register(&mut self, action_type: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        let action_type = action_type.into();
        if self.handlers.insert(action_type.clone(), handler).is_some() {
            tracing::warn!(action_type = action_type.as_str(), "replacing action handler");
        }
    }

    /// Look up the handler for a type tag.
    pub fn lookup(&self, action_type: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(action_type).cloned()
    }

    /// Whether a handler is registered for the given tag.
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// All registered type tags, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticHandler(Value);

    impl ActionHandler for StaticHandler {
        fn execute(
            &self,
            _config: Value,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<Value, ActionError>> + Send + '_>,
        > {
            let result = self.0.clone();
            Box::pin(async move { Ok(result) })
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let mut registry = ActionRegistry::new();
        registry.register("echo", Arc::new(StaticHandler(json!("hi"))));

        let handler = registry.lookup("echo").expect("handler registered");
        let result = handler.execute(json!({})).await.unwrap();
        assert_eq!(result, json!("hi"));
    }

    #[test]
    fn test_lookup_unknown_tag_is_none() {
        let registry = ActionRegistry::new();
        assert!(registry.lookup("nonexistent").is_none());
        assert!(!registry.contains("nonexistent"));
    }

    #[test]
    fn test_register_replaces_previous_handler() {
        let mut registry = ActionRegistry::new();
        registry.register("echo", Arc::new(StaticHandler(json!(1))));
        registry.register("echo", Arc::new(StaticHandler(json!(2))));
        assert_eq!(registry.type_names(), vec!["echo"]);
    }

    #[test]
    fn test_type_names_sorted() {
        let mut registry = ActionRegistry::new();
        registry.register("log", Arc::new(StaticHandler(Value::Null)));
        registry.register("delay", Arc::new(StaticHandler(Value::Null)));
        assert_eq!(registry.type_names(), vec!["delay", "log"]);
    }

    #[test]
    fn test_unknown_type_error_message_is_literal() {
        let err = ActionError::UnknownType("nonexistent".to_string());
        assert_eq!(err.to_string(), "Unknown action type: nonexistent");
    }

    #[test]
    fn test_failed_error_message_is_verbatim() {
        let err = ActionError::Failed("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
    }
}
