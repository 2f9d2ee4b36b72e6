//! Built-in action handler library.
//!
//! Concrete [`ActionHandler`](stepwise_core::engine::registry::ActionHandler)
//! implementations for the common action types, plus [`builtin_registry`] to
//! install all of them at once. Embedders register their own handlers on top
//! of (or instead of) these.
//!
//! - `http_request` -- perform an HTTP request via reqwest
//! - `log` -- emit a message through tracing
//! - `delay` -- pause the run for a bounded duration
//! - `echo` -- return the resolved config unchanged

use std::sync::Arc;

use stepwise_core::engine::registry::ActionRegistry;

pub mod delay;
pub mod echo;
pub mod http;
pub mod log;

/// Build a registry with every built-in handler installed.
pub fn builtin_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register("http_request", Arc::new(http::HttpRequestAction::new()));
    registry.register("log", Arc::new(log::LogAction));
    registry.register("delay", Arc::new(delay::DelayAction));
    registry.register("echo", Arc::new(echo::EchoAction));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_installs_all_handlers() {
        let registry = builtin_registry();
        assert_eq!(
            registry.type_names(),
            vec!["delay", "echo", "http_request", "log"]
        );
    }
}
