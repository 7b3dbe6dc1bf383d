//! Session layer
//!
//! Owns the browser process and page lifecycle behind a small surface:
//! one session, one browser, any number of named tabs.
//!
//! ## Module structure
//! - `manager`: session with lazy browser launch and the named-tab registry
//! - `tab`: per-target handle implementing the engine's query surface
//! - `navigator`: navigation with bounded readiness waiting
//!
//! ## Example
//! ```rust,no_run
//! use kss::config::BrowserConfig;
//! use kss::session::{navigator, Session};
//!
//! # async fn example() -> kss::Result<()> {
//! let mut session = Session::new(BrowserConfig::default());
//! let tab = session.acquire_tab("default").await?;
//! navigator::goto(&tab, "https://example.tistory.com").await?;
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod navigator;
pub mod tab;

pub use manager::Session;
pub use navigator::NavOutcome;
pub use tab::Tab;
