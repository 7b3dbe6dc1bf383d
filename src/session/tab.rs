//! Tab handle over one CDP page target.
//!
//! A [`Tab`] owns the typed client for one browser page and exposes the
//! selector queries the extraction engine runs against it. Handles are cheap
//! to clone; all clones share the same liveness flag, so closing any of them
//! retires the tab everywhere.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cdp::traits::{CdpClient, EvaluationResult, ScreenshotFormat};
use crate::config::BrowserConfig;
use crate::engine::query::{ElementSnapshot, PageQuery};
use crate::error::{Error, Result};

/// Named handle over one page target.
#[derive(Debug, Clone)]
pub struct Tab {
    id: String,
    client: Arc<dyn CdpClient>,
    active: Arc<AtomicBool>,
    last_url: Arc<RwLock<Option<String>>>,
}

/// Shape produced by the in-page snapshot helper.
#[derive(Debug, Deserialize)]
struct SnapshotPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    attrs: HashMap<String, String>,
}

impl SnapshotPayload {
    fn into_snapshot(self, selector: &str, index: usize) -> ElementSnapshot {
        ElementSnapshot {
            selector: selector.to_string(),
            index,
            text: self.text,
            attrs: self.attrs,
        }
    }
}

/// JS helper injected into every query script. Captures trimmed text and the
/// literal attribute map of one element.
const SNAPSHOT_HELPER: &str = "const snap = (el) => { const attrs = {}; \
     for (const a of el.attributes) { attrs[a.name] = a.value; } \
     return { text: (el.textContent || \"\").trim(), attrs: attrs }; };";

impl Tab {
    pub fn new<S: Into<String>>(id: S, client: Arc<dyn CdpClient>) -> Self {
        Self {
            id: id.into(),
            client,
            active: Arc::new(AtomicBool::new(true)),
            last_url: Arc::new(RwLock::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// URL of the last successful navigation, shared across clones.
    pub async fn url(&self) -> Option<String> {
        self.last_url.read().await.clone()
    }

    pub(crate) async fn set_url(&self, url: &str) {
        *self.last_url.write().await = Some(url.to_string());
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.client.connection().is_active()
    }

    pub(crate) fn client(&self) -> &Arc<dyn CdpClient> {
        &self.client
    }

    /// Applies viewport, user agent and request blocking from configuration.
    /// Runs once right after the tab is created.
    pub(crate) async fn apply_profile(&self, config: &BrowserConfig) -> Result<()> {
        self.client
            .call_method(
                "Emulation.setDeviceMetricsOverride",
                json!({
                    "width": config.viewport_width,
                    "height": config.viewport_height,
                    "deviceScaleFactor": 1.0,
                    "mobile": false,
                }),
            )
            .await?;

        if let Some(user_agent) = &config.user_agent {
            self.client
                .call_method(
                    "Network.setUserAgentOverride",
                    json!({ "userAgent": user_agent }),
                )
                .await?;
        }

        if config.block_resources {
            self.enable_resource_blocking().await?;
        }

        Ok(())
    }

    /// Intercepts stylesheet and font requests and aborts them, which keeps
    /// page loads fast without affecting document content.
    async fn enable_resource_blocking(&self) -> Result<()> {
        self.client
            .call_method(
                "Fetch.enable",
                json!({
                    "patterns": [
                        { "resourceType": "Stylesheet", "requestStage": "Request" },
                        { "resourceType": "Font", "requestStage": "Request" },
                    ]
                }),
            )
            .await?;

        let mut paused = self.client.subscribe_events("Fetch.requestPaused").await?;
        let client = self.client.clone();
        let tab_id = self.id.clone();
        tokio::spawn(async move {
            while let Some(event) = paused.recv().await {
                let request_id = match event.params.get("requestId").and_then(Value::as_str) {
                    Some(id) => id.to_string(),
                    None => continue,
                };
                let abort = client
                    .call_method(
                        "Fetch.failRequest",
                        json!({ "requestId": request_id, "errorReason": "Aborted" }),
                    )
                    .await;
                if let Err(e) = abort {
                    debug!("Tab '{}': failed to abort request {}: {}", tab_id, request_id, e);
                }
            }
            debug!("Tab '{}': request blocking loop ended", tab_id);
        });

        Ok(())
    }

    /// Clicks the first element matching `selector`. Returns whether an
    /// element was found and clicked.
    pub async fn click_first(&self, selector: &str) -> Result<bool> {
        self.ensure_active()?;
        let sel = escape_selector(selector);
        let script = format!(
            r#"(() => {{
  const el = document.querySelector("{sel}");
  if (!el) return false;
  el.click();
  return true;
}})()"#
        );
        match self.client.evaluate(&script, false).await? {
            EvaluationResult::Bool(clicked) => Ok(clicked),
            other => Err(Error::script_execution_failed(format!(
                "Unexpected click result: {:?}",
                other
            ))),
        }
    }

    /// Captures a PNG screenshot of the current page.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.ensure_active()?;
        self.client.screenshot(ScreenshotFormat::Png).await
    }

    /// Closes the page target and its connection. Safe to call repeatedly;
    /// only the first call does any work.
    pub async fn close(&self) -> Result<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!("Closing tab '{}'", self.id);
            if let Err(e) = self.client.call_method("Page.close", json!({})).await {
                warn!("Tab '{}': Page.close failed: {}", self.id, e);
            }
            if let Err(e) = self.client.connection().close().await {
                warn!("Tab '{}': connection close failed: {}", self.id, e);
            }
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::tab_not_found(self.id.as_str()))
        }
    }

    async fn evaluate_snapshot(
        &self,
        script: &str,
        selector: &str,
        index: usize,
    ) -> Result<Option<ElementSnapshot>> {
        match self.client.evaluate(script, false).await? {
            EvaluationResult::Null => Ok(None),
            EvaluationResult::String(payload) => {
                let payload: SnapshotPayload = serde_json::from_str(&payload)?;
                Ok(Some(payload.into_snapshot(selector, index)))
            }
            other => Err(Error::script_execution_failed(format!(
                "Unexpected query result: {:?}",
                other
            ))),
        }
    }
}

#[async_trait]
impl PageQuery for Tab {
    async fn query_one(&self, selector: &str) -> Result<Option<ElementSnapshot>> {
        self.ensure_active()?;
        let sel = escape_selector(selector);
        let script = format!(
            r#"(() => {{
  {SNAPSHOT_HELPER}
  const el = document.querySelector("{sel}");
  return el ? JSON.stringify(snap(el)) : null;
}})()"#
        );
        self.evaluate_snapshot(&script, selector, 0).await
    }

    async fn query_all(&self, selector: &str, limit: usize) -> Result<Vec<ElementSnapshot>> {
        self.ensure_active()?;
        let sel = escape_selector(selector);
        let script = format!(
            r#"(() => {{
  {SNAPSHOT_HELPER}
  const nodes = document.querySelectorAll("{sel}");
  const max = Math.min(nodes.length, {limit});
  const out = [];
  for (let i = 0; i < max; i++) {{ out.push(snap(nodes[i])); }}
  return JSON.stringify(out);
}})()"#
        );
        match self.client.evaluate(&script, false).await? {
            EvaluationResult::String(payload) => {
                let payloads: Vec<SnapshotPayload> = serde_json::from_str(&payload)?;
                Ok(payloads
                    .into_iter()
                    .enumerate()
                    .map(|(index, payload)| payload.into_snapshot(selector, index))
                    .collect())
            }
            other => Err(Error::script_execution_failed(format!(
                "Unexpected query result: {:?}",
                other
            ))),
        }
    }

    async fn query_within(
        &self,
        scope: &ElementSnapshot,
        selector: &str,
    ) -> Result<Option<ElementSnapshot>> {
        self.ensure_active()?;
        let scope_sel = escape_selector(&scope.selector);
        let sel = escape_selector(selector);
        let script = format!(
            r#"(() => {{
  {SNAPSHOT_HELPER}
  const scopes = document.querySelectorAll("{scope_sel}");
  const root = scopes[{index}];
  if (!root) return null;
  const el = root.querySelector("{sel}");
  return el ? JSON.stringify(snap(el)) : null;
}})()"#,
            index = scope.index,
        );
        self.evaluate_snapshot(&script, selector, 0).await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.ensure_active()?;
        let sel = escape_selector(selector);
        let script = format!(r#"document.querySelectorAll("{sel}").length"#);
        match self.client.evaluate(&script, false).await? {
            EvaluationResult::Number(count) => Ok(count.max(0.0) as usize),
            other => Err(Error::script_execution_failed(format!(
                "Unexpected count result: {:?}",
                other
            ))),
        }
    }
}

/// Escapes a selector for embedding inside a double-quoted JS string.
fn escape_selector(selector: &str) -> String {
    selector.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::MockCdpClient;

    fn mock_tab() -> (Arc<MockCdpClient>, Tab) {
        let client = Arc::new(MockCdpClient::new());
        let tab = Tab::new("default", client.clone() as Arc<dyn CdpClient>);
        (client, tab)
    }

    #[tokio::test]
    async fn test_query_one_parses_snapshot() {
        let (client, tab) = mock_tab();
        client
            .respond_with(
                r#"querySelector("h1")"#,
                EvaluationResult::String(
                    r#"{"text":"Hello","attrs":{"class":"title"}}"#.to_string(),
                ),
            )
            .await;

        let snapshot = tab.query_one("h1").await.unwrap().unwrap();
        assert_eq!(snapshot.text, "Hello");
        assert_eq!(snapshot.attr("class"), Some("title"));
        assert_eq!(snapshot.selector, "h1");
        assert_eq!(snapshot.index, 0);
    }

    #[tokio::test]
    async fn test_query_one_no_match() {
        let (_client, tab) = mock_tab();
        let result = tab.query_one(".does-not-exist").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_query_all_indexes_snapshots() {
        let (client, tab) = mock_tab();
        client
            .respond_with(
                r#"querySelectorAll(".post")"#,
                EvaluationResult::String(
                    r#"[{"text":"one","attrs":{}},{"text":"two","attrs":{}}]"#.to_string(),
                ),
            )
            .await;

        let snapshots = tab.query_all(".post", 10).await.unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].index, 0);
        assert_eq!(snapshots[1].index, 1);
        assert_eq!(snapshots[1].text, "two");
    }

    #[tokio::test]
    async fn test_count() {
        let (client, tab) = mock_tab();
        client
            .respond_with(
                r#"querySelectorAll(".item").length"#,
                EvaluationResult::Number(3.0),
            )
            .await;

        assert_eq!(tab.count(".item").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_click_first() {
        let (client, tab) = mock_tab();
        client
            .respond_with("el.click()", EvaluationResult::Bool(true))
            .await;

        assert!(tab.click_first("button").await.unwrap());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (_client, tab) = mock_tab();
        tab.close().await.unwrap();
        tab.close().await.unwrap();

        let result = tab.query_one("h1").await;
        assert!(matches!(result, Err(Error::TabNotFound(_))));
    }

    #[tokio::test]
    async fn test_apply_profile() {
        let (_client, tab) = mock_tab();
        tab.apply_profile(&BrowserConfig::default()).await.unwrap();
    }

    #[test]
    fn test_escape_selector() {
        assert_eq!(escape_selector(r#"a[href*="/"]"#), r#"a[href*=\"/\"]"#);
        assert_eq!(escape_selector(".plain"), ".plain");
    }
}
