//! Browser session with a named-tab registry.
//!
//! One [`Session`] owns at most one browser process. The process is launched
//! on first tab acquisition, never at construction, so sessions are free to
//! create until actually used. Tabs are keyed by caller-chosen names;
//! acquiring an existing name returns the live tab instead of opening
//! another one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cdp::browser::CdpBrowserImpl;
use crate::cdp::launcher::{self, LaunchedBrowser};
use crate::cdp::traits::CdpBrowser;
use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use crate::session::tab::Tab;

/// Owns the browser process, its CDP endpoint and all open tabs.
#[derive(Debug)]
pub struct Session {
    config: BrowserConfig,
    process: Option<LaunchedBrowser>,
    browser: Option<Arc<dyn CdpBrowser>>,
    tabs: HashMap<String, Tab>,
}

impl Session {
    /// Creates a session. No browser is launched until a tab is acquired.
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            process: None,
            browser: None,
            tabs: HashMap::new(),
        }
    }

    /// Creates a session over an existing browser backend, bypassing process
    /// launch. Used with mock backends in tests.
    pub fn with_browser(config: BrowserConfig, browser: Arc<dyn CdpBrowser>) -> Self {
        Self {
            config,
            process: None,
            browser: Some(browser),
            tabs: HashMap::new(),
        }
    }

    /// Returns the tab registered under `id`, opening it if necessary.
    /// The first acquisition of any tab launches the browser.
    pub async fn acquire_tab(&mut self, id: &str) -> Result<Tab> {
        if let Some(tab) = self.tabs.get(id) {
            debug!("Reusing tab '{}'", id);
            return Ok(tab.clone());
        }

        let browser = self.ensure_browser().await?;
        let target_url = browser.create_target("about:blank").await?;
        let client = browser.create_client(&target_url).await?;

        let tab = Tab::new(id, client);
        if let Err(e) = tab.apply_profile(&self.config).await {
            let _ = tab.close().await;
            return Err(e);
        }

        info!("Opened tab '{}'", id);
        self.tabs.insert(id.to_string(), tab.clone());
        Ok(tab)
    }

    /// Closes and forgets the tab registered under `id`. Releasing a tab
    /// that is not open is not an error.
    pub async fn release_tab(&mut self, id: &str) -> Result<()> {
        match self.tabs.remove(id) {
            Some(tab) => {
                if let Err(e) = tab.close().await {
                    warn!("Failed to close tab '{}': {}", id, e);
                }
                info!("Released tab '{}'", id);
                Ok(())
            }
            None => {
                debug!("Tab '{}' is not open", id);
                Ok(())
            }
        }
    }

    /// Captures a PNG screenshot of the named tab.
    pub async fn screenshot(&self, tab_id: &str) -> Result<Vec<u8>> {
        let tab = self
            .tabs
            .get(tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;
        tab.screenshot().await
    }

    /// Closes every tab, the browser connections and the browser process.
    /// Safe to call repeatedly and on sessions that never launched.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.tabs.is_empty() && self.browser.is_none() && self.process.is_none() {
            return Ok(());
        }

        info!("Shutting down browser");

        for (id, tab) in self.tabs.drain() {
            if let Err(e) = tab.close().await {
                warn!("Failed to close tab '{}': {}", id, e);
            }
        }

        if let Some(browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser connections: {}", e);
            }
        }

        if let Some(mut process) = self.process.take() {
            process.terminate().await;
        }

        Ok(())
    }

    pub fn open_tabs(&self) -> Vec<String> {
        self.tabs.keys().cloned().collect()
    }

    async fn ensure_browser(&mut self) -> Result<Arc<dyn CdpBrowser>> {
        if let Some(browser) = &self.browser {
            return Ok(browser.clone());
        }

        info!("Starting browser");
        let launched = launcher::launch(&self.config).await?;
        let browser: Arc<dyn CdpBrowser> = Arc::new(CdpBrowserImpl::new(
            launched.endpoint.clone(),
            Duration::from_millis(self.config.timeout_ms),
        ));

        self.process = Some(launched);
        self.browser = Some(browser.clone());
        Ok(browser)
    }
}
