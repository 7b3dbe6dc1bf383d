//! WebSocket transport integration tests
//!
//! Drives the real connection, client and tab stack against the mock
//! Chrome server, so every selector query crosses an actual WebSocket
//! round trip.

mod mock_chrome;

use std::sync::Arc;
use std::time::Duration;

use kss::cdp::{CdpClientImpl, CdpWebSocketConnection};
use kss::engine::PageQuery;
use kss::session::{navigator, NavOutcome, Tab};
use kss::Error;
use mock_chrome::MockChromeServer;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect_tab(server: &MockChromeServer, id: &str) -> Tab {
    let connection = CdpWebSocketConnection::new(server.ws_endpoint(), COMMAND_TIMEOUT)
        .await
        .unwrap();
    let client = Arc::new(CdpClientImpl::new(connection));
    Tab::new(id, client)
}

#[tokio::test]
async fn test_navigate_reports_ready() {
    let server = MockChromeServer::start().await.unwrap();
    let tab = connect_tab(&server, "nav").await;

    let outcome = navigator::goto(&tab, "https://example.com").await.unwrap();
    assert_eq!(outcome, NavOutcome::Ready);
    assert_eq!(tab.url().await.as_deref(), Some("https://example.com"));
}

#[tokio::test]
async fn test_network_error_fails_navigation() {
    let server = MockChromeServer::start().await.unwrap();
    let tab = connect_tab(&server, "nav-fail").await;

    let result = navigator::goto(&tab, "https://unreachable.example").await;
    match result {
        Err(Error::Navigation(message)) => {
            assert!(message.contains("ERR_NAME_NOT_RESOLVED"));
        }
        other => panic!("Expected a navigation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_query_round_trips() {
    let server = MockChromeServer::start().await.unwrap();
    let tab = connect_tab(&server, "query").await;

    let title = tab.query_one("h1").await.unwrap().unwrap();
    assert_eq!(title.text, "Mock Blog");
    assert_eq!(title.attr("id"), Some("main-title"));

    assert!(tab.query_one(".missing").await.unwrap().is_none());

    let posts = tab.query_all(".post", 10).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].text, "First post");
    assert_eq!(posts[1].index, 1);

    assert_eq!(tab.count(".post").await.unwrap(), 3);
    assert_eq!(tab.count(".absent").await.unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_selector_surfaces_as_script_failure() {
    let server = MockChromeServer::start().await.unwrap();
    let tab = connect_tab(&server, "selector").await;

    let result = tab.query_one(r#".row:contains("조회수")"#).await;
    match result {
        Err(Error::ScriptExecutionFailed(message)) => {
            assert!(message.contains("SyntaxError"));
        }
        other => panic!("Expected a script failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_click_reports_presence() {
    let server = MockChromeServer::start().await.unwrap();
    let tab = connect_tab(&server, "click").await;

    assert!(tab.click_first("#consent").await.unwrap());
    assert!(!tab.click_first("#nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_screenshot_returns_png() {
    let server = MockChromeServer::start().await.unwrap();
    let tab = connect_tab(&server, "shot").await;

    let bytes = tab.screenshot().await.unwrap();
    assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[tokio::test]
async fn test_closed_tab_rejects_queries() {
    let server = MockChromeServer::start().await.unwrap();
    let tab = connect_tab(&server, "closing").await;

    tab.close().await.unwrap();
    // A second close is a no-op
    tab.close().await.unwrap();

    match tab.query_one("h1").await {
        Err(Error::TabNotFound(id)) => assert_eq!(id, "closing"),
        other => panic!("Expected tab-not-found, got {:?}", other),
    }
}
