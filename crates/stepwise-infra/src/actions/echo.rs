//! Identity action: returns its resolved config unchanged.
//!
//! Useful for wiring tests and for workflows that only need to restructure
//! context data through an output key.

use serde_json::Value;
use stepwise_core::engine::registry::{ActionError, ActionHandler};

/// Handler for the `echo` action type.
pub struct EchoAction;

impl ActionHandler for EchoAction {
    fn execute(
        &self,
        config: Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Value, ActionError>> + Send + '_>,
    > {
        Box::pin(async move { Ok(config) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_returns_config_unchanged() {
        let result = EchoAction
            .execute(json!({ "nested": ["values", 1, true] }))
            .await
            .unwrap();
        assert_eq!(result, json!({ "nested": ["values", 1, true] }));
    }
}
