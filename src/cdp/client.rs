//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for common operations.

use super::traits::*;
use super::types::{EvaluateParams, EvaluateResponse, NavigateParams, RemoteObject};
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tracing::debug;

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
}

impl CdpClientImpl {
    /// Create a new CDP client
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => {
                let value = obj
                    .value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                EvaluationResult::String(value)
            }
            "number" => {
                let value = obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
                EvaluationResult::Number(value)
            }
            "boolean" => {
                let value = obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false);
                EvaluationResult::Bool(value)
            }
            "undefined" | "null" => EvaluationResult::Null,
            "object" | "function" | "bigint" | "symbol" => {
                let value = obj.value.clone().unwrap_or(serde_json::Value::Null);
                if value.is_null() {
                    EvaluationResult::Null
                } else {
                    EvaluationResult::Object(value)
                }
            }
            other => {
                debug!("parse_remote_object: unknown type '{}', returning Null", other);
                EvaluationResult::Null
            }
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    /// Get the underlying connection
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    /// Issue a navigation to a URL
    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        debug!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
        };

        let result = self
            .call_method("Page.navigate", serde_json::to_value(params)?)
            .await?;

        Ok(NavigationResult {
            url: result
                .get("frame")
                .and_then(|f| f.get("url"))
                .and_then(|u| u.as_str())
                .unwrap_or(url)
                .to_string(),
            error_text: result
                .get("errorText")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }

    /// Evaluate JavaScript in the page
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        };

        let result = self
            .call_method("Runtime.evaluate", serde_json::to_value(params)?)
            .await?;

        let response: EvaluateResponse = serde_json::from_value(result)
            .map_err(|e| Error::cdp(format!("Failed to parse EvaluateResponse: {}", e)))?;

        if let Some(details) = response.exception_details {
            let description = details
                .exception
                .as_ref()
                .and_then(|e| e.description.clone())
                .or(details.text)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(Error::script_execution_failed(description));
        }

        Ok(Self::parse_remote_object(&response.result))
    }

    /// Capture a screenshot
    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        debug!("Capturing screenshot");

        let params = match format {
            ScreenshotFormat::Png => serde_json::json!({ "format": "png" }),
            ScreenshotFormat::Jpeg(quality) => {
                serde_json::json!({ "format": "jpeg", "quality": quality })
            }
        };

        let result = self.call_method("Page.captureScreenshot", params).await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    /// Enable a domain
    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);

        let method = format!("{}.enable", domain);
        let _ = self.call_method(&method, serde_json::json!({})).await?;

        Ok(())
    }

    /// Call a raw CDP method
    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;

        response
            .result
            .ok_or_else(|| Error::cdp("No result in response"))
    }

    /// Subscribe to events of one type
    async fn subscribe_events(&self, event_type: &str) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, Error> {
        debug!("Subscribing to events: {}", event_type);

        let mut event_receiver = self.connection.listen_events().await?;

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let filter = event_type.to_string();

        tokio::spawn(async move {
            while let Some(event) = event_receiver.recv().await {
                if (event.method == filter || filter == "*") && tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_object_string() {
        let obj = RemoteObject {
            r#type: "string".to_string(),
            value: Some(serde_json::json!("test")),
            ..Default::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::String(s) if s == "test"));
    }

    #[test]
    fn test_parse_remote_object_number() {
        let obj = RemoteObject {
            r#type: "number".to_string(),
            value: Some(serde_json::json!(42.5)),
            ..Default::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::Number(n) if n == 42.5));
    }

    #[test]
    fn test_parse_remote_object_bool() {
        let obj = RemoteObject {
            r#type: "boolean".to_string(),
            value: Some(serde_json::json!(true)),
            ..Default::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::Bool(true)));
    }

    #[test]
    fn test_parse_remote_object_null() {
        let obj = RemoteObject {
            r#type: "undefined".to_string(),
            ..Default::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::Null));
    }

    #[test]
    fn test_parse_remote_object_object_null_value() {
        // querySelector misses evaluate to an object-typed null
        let obj = RemoteObject {
            r#type: "object".to_string(),
            subtype: Some("null".to_string()),
            value: Some(serde_json::Value::Null),
            ..Default::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::Null));
    }
}
