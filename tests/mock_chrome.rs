//! Mock Chrome DevTools Protocol server
//!
//! Serves a fixed imaginary page over a real WebSocket so the transport
//! stack can be exercised without a Chrome install. The page knows a
//! handful of selectors: `h1` and `.date` match single elements, `.post`
//! matches three elements (two of which have text), `#consent` is
//! clickable and any `:contains` selector raises a syntax error the way
//! `querySelector` does.

use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};

/// Mock Chrome server
pub struct MockChromeServer {
    addr: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockChromeServer {
    /// Start a new mock Chrome server on an ephemeral port
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let ws_addr = format!("ws://{}", addr);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut connection_id = 0;

            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                tracing::debug!("Mock Chrome: Connection from {}", peer_addr);
                                tokio::spawn(Self::handle_connection(stream, connection_id));
                                connection_id += 1;
                            }
                            Err(e) => {
                                tracing::error!("Mock Chrome: Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Mock Chrome: Shutdown signal received");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            addr: ws_addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Handle a WebSocket connection
    async fn handle_connection(stream: TcpStream, connection_id: u32) {
        match accept_async(stream).await {
            Ok(ws_stream) => {
                let (mut ws_sender, mut ws_receiver) = ws_stream.split();

                while let Some(result) = ws_receiver.next().await {
                    match result {
                        Ok(Message::Text(text)) => {
                            if let Ok(req) = serde_json::from_str::<Value>(&text) {
                                let response = Self::create_cdp_response(&req);
                                if let Ok(resp_text) = serde_json::to_string(&response) {
                                    if ws_sender.send(Message::Text(resp_text)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            tracing::debug!("Mock Chrome: Connection {} closed", connection_id);
                            break;
                        }
                        Err(e) => {
                            tracing::debug!("Mock Chrome: WebSocket error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }
            }
            Err(e) => {
                tracing::error!("Mock Chrome: WebSocket handshake error: {}", e);
            }
        }
    }

    /// Create a CDP response for a request
    fn create_cdp_response(req: &Value) -> Value {
        let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("unknown");
        let id = req.get("id").and_then(|i| i.as_i64()).unwrap_or(0);

        match method {
            "Page.navigate" => {
                let url = req
                    .get("params")
                    .and_then(|p| p.get("url"))
                    .and_then(|u| u.as_str())
                    .unwrap_or("");

                if url.contains("unreachable") {
                    json!({
                        "id": id,
                        "result": {
                            "frameId": "mock-frame",
                            "errorText": "net::ERR_NAME_NOT_RESOLVED"
                        }
                    })
                } else {
                    json!({
                        "id": id,
                        "result": {
                            "frameId": "mock-frame",
                            "loaderId": "mock-loader"
                        }
                    })
                }
            }
            "Runtime.evaluate" => {
                let expression = req
                    .get("params")
                    .and_then(|p| p.get("expression"))
                    .and_then(|e| e.as_str())
                    .unwrap_or("");
                Self::evaluate_response(id, expression)
            }
            "Page.captureScreenshot" => json!({
                "id": id,
                "result": {
                    "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg=="
                }
            }),
            // Domain enables, overrides, Page.close and the rest succeed
            // with an empty result, like a compliant target.
            _ => json!({
                "id": id,
                "result": {}
            }),
        }
    }

    /// Answer a Runtime.evaluate call against the fixed page
    fn evaluate_response(id: i64, expression: &str) -> Value {
        // querySelector throws on nonstandard pseudo-classes
        if expression.contains(":contains(") {
            return json!({
                "id": id,
                "result": {
                    "result": { "type": "undefined" },
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "lineNumber": 1,
                        "columnNumber": 1,
                        "exception": {
                            "type": "object",
                            "description": "SyntaxError: Failed to execute 'querySelector' on 'Document'"
                        }
                    }
                }
            });
        }

        if expression.contains("readyState === 'complete'") {
            return Self::value_response(id, json!({ "type": "boolean", "value": true }));
        }

        if expression.contains("el.click()") {
            let clicked = expression.contains("#consent");
            return Self::value_response(id, json!({ "type": "boolean", "value": clicked }));
        }

        // Snapshot-list scripts serialize an array of elements
        if expression.contains("JSON.stringify(out)") {
            let payload = if expression.contains("querySelectorAll(\".post\")") {
                json!([
                    { "text": "First post", "attrs": {} },
                    { "text": "Second post", "attrs": {} }
                ])
                .to_string()
            } else {
                "[]".to_string()
            };
            return Self::value_response(id, json!({ "type": "string", "value": payload }));
        }

        // Single-snapshot scripts serialize one element or return null
        if expression.contains("JSON.stringify(snap(el))") {
            if expression.contains("querySelector(\"h1\")") {
                let payload = json!({
                    "text": "Mock Blog",
                    "attrs": { "id": "main-title" }
                })
                .to_string();
                return Self::value_response(id, json!({ "type": "string", "value": payload }));
            }
            if expression.contains("querySelector(\".date\")") {
                let payload = json!({ "text": "2024-01-15", "attrs": {} }).to_string();
                return Self::value_response(id, json!({ "type": "string", "value": payload }));
            }
            return Self::value_response(
                id,
                json!({ "type": "object", "subtype": "null", "value": null }),
            );
        }

        // Count scripts evaluate to a plain number
        if expression.contains(".length") {
            let count = if expression.contains("querySelectorAll(\".post\")") {
                3
            } else {
                0
            };
            return Self::value_response(id, json!({ "type": "number", "value": count }));
        }

        Self::value_response(id, json!({ "type": "undefined" }))
    }

    fn value_response(id: i64, remote_object: Value) -> Value {
        json!({
            "id": id,
            "result": {
                "result": remote_object
            }
        })
    }

    /// Get the WebSocket endpoint URL
    pub fn ws_endpoint(&self) -> &str {
        &self.addr
    }
}

impl Drop for MockChromeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_chrome_startup() {
        let server = MockChromeServer::start().await.unwrap();
        assert!(server.ws_endpoint().starts_with("ws://127.0.0.1:"));
    }

    #[test]
    fn test_navigation_failure_shape() {
        let req = json!({
            "id": 7,
            "method": "Page.navigate",
            "params": { "url": "https://unreachable.example" }
        });
        let resp = MockChromeServer::create_cdp_response(&req);
        assert_eq!(resp["id"], 7);
        assert_eq!(resp["result"]["errorText"], "net::ERR_NAME_NOT_RESOLVED");
    }

    #[test]
    fn test_contains_selector_raises() {
        let req = json!({
            "id": 8,
            "method": "Runtime.evaluate",
            "params": { "expression": "document.querySelector(\".x:contains(\\\"y\\\")\")" }
        });
        let resp = MockChromeServer::create_cdp_response(&req);
        assert!(resp["result"]["exceptionDetails"]["exception"]["description"]
            .as_str()
            .unwrap()
            .contains("SyntaxError"));
    }
}
