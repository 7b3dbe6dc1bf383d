//! KSS: headless-browser analyzer for Korean social platforms
//!
//! Drives a Chrome process over the DevTools protocol, renders
//! JavaScript-heavy pages and extracts structured records from them using
//! per-platform selector rule tables. Tistory blogs and YouTube channels
//! are supported today.

pub mod error;
pub mod config;

pub mod batch;
pub mod cdp;
pub mod engine;
pub mod output;
pub mod platform;
pub mod record;
pub mod session;

// Re-exports
pub use batch::{batch_analyze, BatchItem};
pub use error::{Error, Result};
pub use platform::{analyze, detect_platform, Platform};
pub use record::{AnalysisRecord, BatchOutcome};
pub use session::Session;

/// KSS library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
