//! Delay action: pauses the run for a bounded duration.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use stepwise_core::engine::registry::{ActionError, ActionHandler};

/// Upper bound on a single delay (5 minutes).
pub const MAX_DELAY_MS: u64 = 300_000;

/// Handler for the `delay` action type.
pub struct DelayAction;

#[derive(Debug, Deserialize)]
struct DelayConfig {
    milliseconds: u64,
}

/// Clamp a requested delay to [`MAX_DELAY_MS`].
fn clamp_delay(ms: u64) -> u64 {
    ms.min(MAX_DELAY_MS)
}

impl ActionHandler for DelayAction {
    fn execute(
        &self,
        config: Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Value, ActionError>> + Send + '_>,
    > {
        Box::pin(async move {
            let config: DelayConfig = serde_json::from_value(config)
                .map_err(|e| ActionError::InvalidConfig(e.to_string()))?;

            let ms = clamp_delay(config.milliseconds);
            if ms < config.milliseconds {
                tracing::warn!(
                    requested_ms = config.milliseconds,
                    capped_ms = ms,
                    "delay exceeds cap"
                );
            }
            tokio::time::sleep(Duration::from_millis(ms)).await;

            Ok(json!({ "slept_ms": ms }))
        })
    }
}
