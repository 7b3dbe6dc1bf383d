//! Mock CDP implementation for testing
//!
//! This module provides mock implementations of CDP traits for development and testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cdp::traits::*;
use crate::Error;

/// Mock CDP connection
#[derive(Debug)]
pub struct MockCdpConnection {
    is_active: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self {
            is_active: Arc::new(AtomicBool::new(true)),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, _params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Connection is closed"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let result = match method {
            "Page.navigate" => serde_json::json!({
                "frameId": format!("mock-frame-{}", id),
                "loaderId": format!("mock-loader-{}", id),
            }),
            "Runtime.evaluate" => serde_json::json!({
                "result": { "type": "string", "value": "mock result" }
            }),
            "Page.captureScreenshot" => serde_json::json!({
                "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg=="
            }),
            _ => serde_json::json!({}),
        };

        Ok(CdpResponse {
            id,
            result: Some(result),
            error: None,
        })
    }

    async fn listen_events(&self) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Connection is closed"));
        }

        let (_tx, rx) = tokio::sync::mpsc::channel(100);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Mock CDP client
///
/// Evaluation is script-sensitive so session and navigator code paths behave
/// as they would against a live page. Canned responses registered via
/// [`MockCdpClient::respond_with`] take priority over the built-in heuristics.
#[derive(Debug)]
pub struct MockCdpClient {
    connection: Arc<MockCdpConnection>,
    navigations: Mutex<Vec<String>>,
    navigation_error: Mutex<Option<String>>,
    canned: Mutex<Vec<(String, EvaluationResult)>>,
}

impl MockCdpClient {
    /// Create a new mock CDP client
    pub fn new() -> Self {
        Self {
            connection: Arc::new(MockCdpConnection::new()),
            navigations: Mutex::new(Vec::new()),
            navigation_error: Mutex::new(None),
            canned: Mutex::new(Vec::new()),
        }
    }

    /// Register a canned evaluation result for scripts containing `pattern`
    pub async fn respond_with<S: Into<String>>(&self, pattern: S, result: EvaluationResult) {
        self.canned.lock().await.push((pattern.into(), result));
    }

    /// Make subsequent navigations report a net-level error
    pub async fn fail_navigation<S: Into<String>>(&self, error_text: S) {
        *self.navigation_error.lock().await = Some(error_text.into());
    }

    /// Clear a previously set navigation error
    pub async fn clear_navigation_error(&self) {
        *self.navigation_error.lock().await = None;
    }

    /// URLs passed to navigate, in order
    pub async fn navigated_urls(&self) -> Vec<String> {
        self.navigations.lock().await.clone()
    }
}

impl Default for MockCdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        self.connection.clone()
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        if !self.connection.is_active() {
            return Err(Error::cdp("Connection is closed"));
        }

        self.navigations.lock().await.push(url.to_string());

        Ok(NavigationResult {
            url: url.to_string(),
            error_text: self.navigation_error.lock().await.clone(),
        })
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult, Error> {
        if !self.connection.is_active() {
            return Err(Error::cdp("Connection is closed"));
        }

        for (pattern, result) in self.canned.lock().await.iter() {
            if script.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }

        if script.contains("readyState === 'complete'") {
            Ok(EvaluationResult::Bool(true))
        } else if script.contains("document.readyState") {
            Ok(EvaluationResult::String("complete".to_string()))
        } else if script.contains("document.body") {
            Ok(EvaluationResult::Bool(true))
        } else if script.contains("document.title") {
            Ok(EvaluationResult::String("Test Page".to_string()))
        } else {
            Ok(EvaluationResult::Null)
        }
    }

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        if !self.connection.is_active() {
            return Err(Error::cdp("Connection is closed"));
        }

        Ok(match format {
            ScreenshotFormat::Png => vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            ScreenshotFormat::Jpeg(_) => vec![0xFF, 0xD8, 0xFF, 0xE0],
        })
    }

    async fn enable_domain(&self, _domain: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;

        response
            .result
            .ok_or_else(|| Error::cdp("No result in response"))
    }

    async fn subscribe_events(&self, _event_type: &str) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, Error> {
        self.connection.listen_events().await
    }
}

/// Mock CDP browser
#[derive(Debug)]
pub struct MockCdpBrowser {
    is_active: AtomicBool,
    next_target: AtomicU64,
    clients: Mutex<Vec<Arc<MockCdpClient>>>,
}

impl MockCdpBrowser {
    /// Create a new mock CDP browser
    pub fn new() -> Self {
        Self {
            is_active: AtomicBool::new(true),
            next_target: AtomicU64::new(1),
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Clients handed out so far, in creation order
    pub async fn created_clients(&self) -> Vec<Arc<MockCdpClient>> {
        self.clients.lock().await.clone()
    }
}

impl Default for MockCdpBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_client(&self, _target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Browser is closed"));
        }

        let client = Arc::new(MockCdpClient::new());
        self.clients.lock().await.push(Arc::clone(&client));
        Ok(client)
    }

    async fn create_target(&self, _url: &str) -> Result<String, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Browser is closed"));
        }

        let target_id = self.next_target.fetch_add(1, Ordering::Relaxed);
        Ok(format!("ws://localhost:9222/devtools/page/mock-{}", target_id))
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connection() {
        let conn = MockCdpConnection::new();
        assert!(conn.is_active());

        let response = conn
            .send_command("Runtime.evaluate", serde_json::json!({}))
            .await
            .unwrap();
        assert!(response.result.is_some());
        assert!(response.error.is_none());

        conn.close().await.unwrap();
        assert!(!conn.is_active());
    }

    #[tokio::test]
    async fn test_mock_client_navigation_log() {
        let client = MockCdpClient::new();

        let result = client.navigate("https://example.com").await.unwrap();
        assert_eq!(result.url, "https://example.com");
        assert!(result.error_text.is_none());

        assert_eq!(client.navigated_urls().await, vec!["https://example.com"]);
    }

    #[tokio::test]
    async fn test_mock_client_navigation_error() {
        let client = MockCdpClient::new();
        client.fail_navigation("net::ERR_NAME_NOT_RESOLVED").await;

        let result = client.navigate("https://nope.invalid").await.unwrap();
        assert_eq!(result.error_text.as_deref(), Some("net::ERR_NAME_NOT_RESOLVED"));

        client.clear_navigation_error().await;
        let result = client.navigate("https://example.com").await.unwrap();
        assert!(result.error_text.is_none());
    }

    #[tokio::test]
    async fn test_mock_client_canned_responses() {
        let client = MockCdpClient::new();
        client
            .respond_with("document.readyState", EvaluationResult::String("loading".into()))
            .await;

        let result = client.evaluate("document.readyState", false).await.unwrap();
        assert!(matches!(result, EvaluationResult::String(s) if s == "loading"));
    }

    #[tokio::test]
    async fn test_mock_browser() {
        let browser = MockCdpBrowser::new();

        let ws_url = browser.create_target("about:blank").await.unwrap();
        assert!(ws_url.starts_with("ws://localhost:9222/devtools/page/mock-"));

        let _client = browser.create_client(&ws_url).await.unwrap();
        assert_eq!(browser.created_clients().await.len(), 1);

        browser.close().await.unwrap();
        assert!(browser.create_target("about:blank").await.is_err());
    }
}
