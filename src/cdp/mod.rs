//! Chrome DevTools Protocol (CDP) layer
//!
//! WebSocket communication with a spawned Chrome/Chromium process, typed
//! around the small slice of the protocol this crate drives.
//!
//! - `traits`: core trait definitions for connections, clients and browsers
//! - `types`: CDP wire types
//! - `connection`: WebSocket JSON-RPC connection implementation
//! - `client`: high-level client (navigate, evaluate, screenshot)
//! - `browser`: target management over the DevTools HTTP endpoints
//! - `launcher`: Chrome process spawn and endpoint discovery
//! - `mock`: mock implementations for testing

pub mod browser;
pub mod client;
pub mod connection;
pub mod launcher;
pub mod mock;
pub mod traits;
pub mod types;

pub use traits::{
    CdpBrowser, CdpClient, CdpConnection, CdpError, CdpEvent, CdpResponse, EvaluationResult,
    NavigationResult, ScreenshotFormat,
};

// Re-export implementation structs
pub use browser::CdpBrowserImpl;
pub use client::CdpClientImpl;
pub use connection::CdpWebSocketConnection;
pub use launcher::{launch, LaunchedBrowser};

// Re-export mock for development/testing
pub use mock::{MockCdpBrowser, MockCdpClient};
