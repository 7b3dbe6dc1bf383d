//! CDP browser control implementation
//!
//! Browser-level operations over the DevTools HTTP endpoints: target creation
//! via `/json/new`, plus bookkeeping of the per-target WebSocket connections
//! opened through it.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Browser WebSocket endpoint (e.g., "ws://127.0.0.1:9222")
    endpoint: String,
    /// Derived HTTP endpoint for the /json API
    http_endpoint: String,
    /// HTTP client for the /json API
    http: reqwest::Client,
    /// Command timeout handed to each new connection
    command_timeout: Duration,
    /// Active connections (target_id -> connection)
    connections: Arc<Mutex<HashMap<String, Arc<dyn CdpConnection>>>>,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - Browser WebSocket endpoint (e.g., "ws://127.0.0.1:9222")
    /// * `command_timeout` - per-command timeout applied to every target connection
    pub fn new<S: Into<String>>(endpoint: S, command_timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        let http_endpoint = endpoint
            .replace("ws://", "http://")
            .replace("wss://", "https://");

        Self {
            endpoint,
            http_endpoint,
            http: reqwest::Client::new(),
            command_timeout,
            connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    /// Create a new CDP client attached to a target WebSocket URL
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        debug!("Creating CDP client for target: {}", target_url);

        let connection = CdpWebSocketConnection::new(target_url, self.command_timeout).await?;

        let target_id = target_url.rsplit('/').next().unwrap_or("unknown").to_string();
        self.connections
            .lock()
            .await
            .insert(target_id, Arc::clone(&connection) as Arc<dyn CdpConnection>);

        let client = Arc::new(CdpClientImpl::new(connection));

        // Page and Runtime are needed by every caller; other domains are
        // enabled on demand.
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    /// Create a new browser target (page) via the /json/new endpoint
    async fn create_target(&self, url: &str) -> Result<String, Error> {
        let new_url = format!("{}/json/new?{}", self.http_endpoint, url);
        debug!("Creating new target: {}", new_url);

        let response = self.http.put(&new_url).send().await.map_err(|e| {
            Error::cdp(format!(
                "Failed to reach DevTools endpoint {}: {}",
                self.endpoint, e
            ))
        })?;

        let target_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::cdp(format!("Failed to parse new target response: {}", e)))?;

        let ws_url = target_json
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No webSocketDebuggerUrl in new target response"))?;

        debug!("Created target with WebSocket URL: {}", ws_url);

        Ok(ws_url.to_string())
    }

    /// Close all client connections
    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;

        if connections.is_empty() {
            return Ok(());
        }

        info!("Closing {} CDP connection(s)", connections.len());

        for (target_id, connection) in connections.iter() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target_id, e);
            }
        }

        connections.clear();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_conversion() {
        let browser = CdpBrowserImpl::new("ws://localhost:9222", Duration::from_secs(30));
        assert_eq!(browser.endpoint, "ws://localhost:9222");
        assert_eq!(browser.http_endpoint, "http://localhost:9222");

        let secure = CdpBrowserImpl::new("wss://remote.example.com:9222", Duration::from_secs(30));
        assert_eq!(secure.http_endpoint, "https://remote.example.com:9222");
    }
}
