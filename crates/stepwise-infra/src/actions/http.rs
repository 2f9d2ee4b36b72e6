//! HTTP request action: performs a real HTTP call via reqwest.
//!
//! The handler receives its config already resolved, so URLs, headers, and
//! bodies may have been assembled from trigger data and earlier step outputs.
//! The response is returned as `{status, headers, body}` and is therefore
//! available to later steps through the action's output key.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use stepwise_core::engine::registry::{ActionError, ActionHandler};

/// Handler for the `http_request` action type.
pub struct HttpRequestAction {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HttpRequestConfig {
    method: String,
    url: String,
    #[serde(default)]
    headers: Option<HashMap<String, String>>,
    #[serde(default)]
    body: Option<String>,
}

impl HttpRequestAction {
    /// Create the handler with its shared HTTP client.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("stepwise-workflow/0.1")
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpRequestAction {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionHandler for HttpRequestAction {
    fn execute(
        &self,
        config: Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Value, ActionError>> + Send + '_>,
    > {
        Box::pin(async move {
            let config: HttpRequestConfig = serde_json::from_value(config)
                .map_err(|e| ActionError::InvalidConfig(e.to_string()))?;

            let method: reqwest::Method = config.method.parse().map_err(|_| {
                ActionError::InvalidConfig(format!("invalid HTTP method: {}", config.method))
            })?;

            let mut request = self.client.request(method, &config.url);

            if let Some(headers) = &config.headers {
                for (key, value) in headers {
                    request = request.header(key.as_str(), value.as_str());
                }
            }
            if let Some(body) = &config.body {
                request = request.body(body.clone());
            }

            let response = request.send().await.map_err(|e| {
                ActionError::Failed(format!("HTTP request to '{}' failed: {e}", config.url))
            })?;

            let status = response.status().as_u16();
            let response_headers: HashMap<String, String> = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        v.to_str().unwrap_or("<binary>").to_string(),
                    )
                })
                .collect();
            let body = response.text().await.map_err(|e| {
                ActionError::Failed(format!("failed to read HTTP response body: {e}"))
            })?;

            tracing::info!(
                url = config.url.as_str(),
                status,
                body_len = body.len(),
                "http_request action completed"
            );

            Ok(json!({
                "status": status,
                "headers": response_headers,
                "body": body,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url_is_invalid_config() {
        let action = HttpRequestAction::new();
        let err = action
            .execute(json!({ "method": "GET" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_invalid_method_is_invalid_config() {
        let action = HttpRequestAction::new();
        let err = action
            .execute(json!({ "method": "NOT A METHOD", "url": "https://example.com" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid HTTP method"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_handler_failure() {
        let action = HttpRequestAction::new();
        // Port 1 on localhost refuses connections immediately; no network needed.
        let err = action
            .execute(json!({ "method": "GET", "url": "http://127.0.0.1:1/" }))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("http://127.0.0.1:1/"), "got: {message}");
    }
}
