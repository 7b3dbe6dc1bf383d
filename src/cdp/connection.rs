//! CDP WebSocket connection implementation
//!
//! This module provides the WebSocket-based JSON-RPC transport to a Chrome
//! DevTools Protocol target. Commands are correlated to responses through a
//! pending-command map; notifications are fanned out to event subscribers.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpEvent, CdpResponse};
use super::types::{CdpNotification, CdpRequest, CdpRpcResponse};
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: oneshot::Sender<CdpResponse>,
    /// Command method (for logging)
    method: String,
}

/// CDP WebSocket connection
///
/// The stream is split at connect time: a spawned reader task owns the read
/// half and routes incoming frames, while senders share the write half behind
/// a mutex. Nothing holds both halves, so sends never stall the reader.
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// Write half of the WebSocket stream
    writer: Arc<Mutex<WsWriter>>,
    /// Next command ID
    next_id: AtomicU64,
    /// Pending commands (ID -> response sender)
    pending_commands: Arc<Mutex<HashMap<u64, PendingCommand>>>,
    /// Event subscribers
    event_subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
    /// Is connection active
    is_active: Arc<AtomicBool>,
    /// Upper bound for one command round trip
    command_timeout: Duration,
}

impl std::fmt::Debug for CdpWebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpWebSocketConnection")
            .field("url", &self.url)
            .field("is_active", &self.is_active.load(Ordering::Relaxed))
            .finish()
    }
}

impl CdpWebSocketConnection {
    /// Connect to a CDP target WebSocket URL
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    /// * `command_timeout` - upper bound for any single command round trip
    pub async fn new<S: Into<String>>(url: S, command_timeout: Duration) -> Result<Arc<Self>, Error> {
        let url = url.into();
        debug!("Connecting to CDP WebSocket: {}", url);

        let (ws_stream, _) = connect_async(&url)
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;

        let (writer, reader) = ws_stream.split();

        let connection = Arc::new(Self {
            url,
            writer: Arc::new(Mutex::new(writer)),
            next_id: AtomicU64::new(1),
            pending_commands: Arc::new(Mutex::new(HashMap::new())),
            event_subscribers: Arc::new(Mutex::new(Vec::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            command_timeout,
        });

        connection.spawn_reader(reader);
        info!("CDP WebSocket connection established: {}", connection.url);

        Ok(connection)
    }

    /// Spawn the task that owns the read half and routes incoming frames
    fn spawn_reader(&self, mut reader: WsReader) {
        let writer = Arc::clone(&self.writer);
        let pending_commands = Arc::clone(&self.pending_commands);
        let event_subscribers = Arc::clone(&self.event_subscribers);
        let is_active = Arc::clone(&self.is_active);

        tokio::spawn(async move {
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        Self::dispatch_message(&text, &pending_commands, &event_subscribers).await;
                    }
                    Ok(Message::Ping(data)) => {
                        let mut writer = writer.lock().await;
                        if let Err(e) = writer.send(Message::Pong(data)).await {
                            warn!("Failed to send pong: {}", e);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("WebSocket close frame received");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }

            is_active.store(false, Ordering::SeqCst);
            // Dropping the senders fails pending waiters and ends subscriber
            // forwarding loops, so nothing waits on a dead connection.
            pending_commands.lock().await.clear();
            event_subscribers.lock().await.clear();
            debug!("CDP reader task exited");
        });
    }

    /// Route one incoming text frame to a pending command or the subscribers
    async fn dispatch_message(
        text: &str,
        pending_commands: &Arc<Mutex<HashMap<u64, PendingCommand>>>,
        event_subscribers: &Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
    ) {
        // Responses carry an id; notifications do not.
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            let mut pending = pending_commands.lock().await;

            if let Some(pending_cmd) = pending.remove(&response.id) {
                debug!(
                    "Received response for command {} ({})",
                    response.id, pending_cmd.method
                );

                let cdp_response = CdpResponse {
                    id: response.id,
                    result: Some(response.result),
                    error: response.error.map(|e| CdpErrorResponse {
                        code: e.code,
                        message: e.message,
                        data: e.data,
                    }),
                };

                let _ = pending_cmd.sender.send(cdp_response);
            } else {
                warn!("Received response for unknown command ID: {}", response.id);
            }
            return;
        }

        if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            debug!("Received event: {}", notification.method);

            let event = CdpEvent {
                method: notification.method,
                params: notification.params,
            };

            let mut subscribers = event_subscribers.lock().await;
            subscribers.retain(|sender| sender.send(event.clone()).is_ok());
            return;
        }

        warn!("Unknown message format: {}", text);
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    /// Send a CDP command and wait for response
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };

        let json = serde_json::to_string(&request)
            .map_err(|e| Error::cdp(format!("Failed to serialize request: {}", e)))?;

        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = oneshot::channel();

        {
            let mut pending = self.pending_commands.lock().await;
            pending.insert(
                id,
                PendingCommand {
                    sender,
                    method: method.to_string(),
                },
            );
        }

        let send_result = {
            let mut writer = self.writer.lock().await;
            writer.send(Message::Text(json)).await
        };

        if let Err(e) = send_result {
            self.pending_commands.lock().await.remove(&id);
            return Err(Error::websocket(format!("Failed to send command: {}", e)));
        }

        match tokio::time::timeout(self.command_timeout, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{} failed: {} (code {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed before response to {} (id {})",
                method, id
            ))),
            Err(_) => {
                self.pending_commands.lock().await.remove(&id);
                Err(Error::timeout(format!(
                    "Command {} (id {}) timed out after {:?}",
                    method, id, self.command_timeout
                )))
            }
        }
    }

    /// Subscribe to CDP events
    async fn listen_events(&self) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let (sender, receiver) = mpsc::channel(100);
        let (unbounded_sender, mut unbounded_receiver) = mpsc::unbounded_channel();

        self.event_subscribers.lock().await.push(unbounded_sender);

        // Forward from the broadcast side into a bounded channel per subscriber
        tokio::spawn(async move {
            while let Some(event) = unbounded_receiver.recv().await {
                if sender.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(receiver)
    }

    /// Close the connection
    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        debug!("Closing CDP WebSocket connection: {}", self.url);

        let mut writer = self.writer.lock().await;
        writer
            .close()
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;

        Ok(())
    }

    /// Check if connection is active
    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
