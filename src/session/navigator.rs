//! Navigation with bounded readiness waiting.
//!
//! Navigation failures come in two kinds and they are handled differently.
//! A net-level failure (unreachable host, refused connection) means the page
//! does not exist for our purposes and is fatal for the current analysis. A
//! slow page is not: once the readiness window expires we proceed against
//! whatever content is present and let per-field defaults cover the rest.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::cdp::traits::EvaluationResult;
use crate::error::{Error, Result};
use crate::session::tab::Tab;

/// Outcome of a successful navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// The document reported itself loaded within the readiness window.
    Ready,
    /// The readiness window expired; the page may be partially loaded.
    Degraded,
}

/// How long to wait for the document to become usable after navigation.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A document is usable once a body exists or loading has finished,
/// whichever the page reaches first.
const READY_PROBE: &str = "document.readyState === 'complete' || document.body !== null";

/// Navigates `tab` to `url` and waits for the document to become usable.
pub async fn goto(tab: &Tab, url: &str) -> Result<NavOutcome> {
    info!("Loading page: {}", url);

    let nav = tab
        .client()
        .navigate(url)
        .await
        .map_err(|e| Error::navigation(e.to_string()))?;

    if let Some(reason) = nav.error_text {
        return Err(Error::navigation(format!("{}: {}", url, reason)));
    }
    tab.set_url(&nav.url).await;

    wait_for_ready(tab, READY_TIMEOUT).await
}

pub(crate) async fn wait_for_ready(tab: &Tab, timeout: Duration) -> Result<NavOutcome> {
    let deadline = Instant::now() + timeout;

    loop {
        if !tab.is_active() {
            return Err(Error::navigation("Browser connection lost".to_string()));
        }

        match tab.client().evaluate(READY_PROBE, false).await {
            Ok(EvaluationResult::Bool(true)) => return Ok(NavOutcome::Ready),
            Ok(_) => {}
            Err(e) => debug!("Readiness probe failed, retrying: {}", e),
        }

        if Instant::now() >= deadline {
            warn!("Page load timed out, continuing with partial content");
            return Ok(NavOutcome::Degraded);
        }

        sleep(READY_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cdp::mock::MockCdpClient;
    use crate::cdp::traits::CdpClient;

    fn mock_tab() -> (Arc<MockCdpClient>, Tab) {
        let client = Arc::new(MockCdpClient::new());
        let tab = Tab::new("default", client.clone() as Arc<dyn CdpClient>);
        (client, tab)
    }

    #[tokio::test]
    async fn test_goto_ready() {
        let (client, tab) = mock_tab();

        let outcome = goto(&tab, "https://example.tistory.com").await.unwrap();
        assert_eq!(outcome, NavOutcome::Ready);
        assert_eq!(
            client.navigated_urls().await,
            vec!["https://example.tistory.com"]
        );
        assert_eq!(tab.url().await.as_deref(), Some("https://example.tistory.com"));
    }

    #[tokio::test]
    async fn test_goto_net_error_is_fatal() {
        let (client, tab) = mock_tab();
        client.fail_navigation("net::ERR_NAME_NOT_RESOLVED").await;

        let result = goto(&tab, "https://nope.invalid").await;
        assert!(matches!(result, Err(Error::Navigation(_))));
        assert_eq!(tab.url().await, None);
    }

    #[tokio::test]
    async fn test_ready_window_expiry_degrades() {
        let (client, tab) = mock_tab();
        client
            .respond_with("readyState === 'complete'", EvaluationResult::Bool(false))
            .await;

        let outcome = wait_for_ready(&tab, Duration::from_millis(300)).await.unwrap();
        assert_eq!(outcome, NavOutcome::Degraded);
    }

    #[tokio::test]
    async fn test_goto_dead_connection() {
        let (client, tab) = mock_tab();
        client.connection().close().await.unwrap();

        let result = goto(&tab, "https://example.com").await;
        assert!(matches!(result, Err(Error::Navigation(_))));
    }
}
