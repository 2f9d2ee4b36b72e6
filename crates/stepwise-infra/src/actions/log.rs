//! Log action: emits a message through the tracing subscriber.

use serde::Deserialize;
use serde_json::{Value, json};
use stepwise_core::engine::registry::{ActionError, ActionHandler};

/// Handler for the `log` action type.
pub struct LogAction;

#[derive(Debug, Deserialize)]
struct LogConfig {
    message: String,
    /// One of trace/debug/info/warn/error. Anything else logs at info.
    #[serde(default)]
    level: Option<String>,
}

impl ActionHandler for LogAction {
    fn execute(
        &self,
        config: Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Value, ActionError>> + Send + '_>,
    > {
        Box::pin(async move {
            let config: LogConfig = serde_json::from_value(config)
                .map_err(|e| ActionError::InvalidConfig(e.to_string()))?;

            let message = config.message.as_str();
            match config.level.as_deref() {
                Some("trace") => tracing::trace!(message, "workflow log action"),
                Some("debug") => tracing::debug!(message, "workflow log action"),
                Some("warn") => tracing::warn!(message, "workflow log action"),
                Some("error") => tracing::error!(message, "workflow log action"),
                _ => tracing::info!(message, "workflow log action"),
            }

            Ok(json!({ "logged": true, "message": config.message }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_returns_message() {
        let result = LogAction
            .execute(json!({ "message": "digest ready" }))
            .await
            .unwrap();
        assert_eq!(result, json!({ "logged": true, "message": "digest ready" }));
    }

    #[tokio::test]
    async fn test_log_accepts_level() {
        let result = LogAction
            .execute(json!({ "message": "careful", "level": "warn" }))
            .await
            .unwrap();
        assert_eq!(result["logged"], json!(true));
    }

    #[tokio::test]
    async fn test_log_without_message_is_invalid_config() {
        let err = LogAction.execute(json!({ "level": "info" })).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidConfig(_)));
    }
}
