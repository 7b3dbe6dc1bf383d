//! Chrome process launcher
//!
//! Spawns a Chrome/Chromium process with remote debugging enabled and polls
//! the DevTools HTTP endpoint until it is ready to accept connections.

use crate::config::BrowserConfig;
use crate::{Error, Result};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Executable names tried in order when no explicit path is configured
const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Attempts made against /json/version before giving up
const ENDPOINT_ATTEMPTS: u32 = 20;

/// Delay between endpoint attempts
const ENDPOINT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A running Chrome process and its DevTools endpoint
#[derive(Debug)]
pub struct LaunchedBrowser {
    child: Child,
    /// Browser WebSocket endpoint base (e.g., "ws://127.0.0.1:9222")
    pub endpoint: String,
}

impl LaunchedBrowser {
    /// Terminate the Chrome process
    ///
    /// The child is also armed with kill-on-drop, so an unwound stack cannot
    /// leave a renderer behind.
    pub async fn terminate(&mut self) {
        match self.child.kill().await {
            Ok(()) => debug!("Chrome process terminated"),
            Err(e) => warn!("Failed to kill Chrome process: {}", e),
        }
    }
}

/// Spawn Chrome with remote debugging and wait for its DevTools endpoint
pub async fn launch(config: &BrowserConfig) -> Result<LaunchedBrowser> {
    let mut args = vec![
        format!("--remote-debugging-port={}", config.debug_port),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-infobars".to_string(),
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
    ];

    if config.headless {
        args.push("--headless=new".to_string());
    }

    let child = spawn_process(config, &args)?;
    let endpoint = format!("ws://127.0.0.1:{}", config.debug_port);

    match wait_for_endpoint(config.debug_port).await {
        Ok(ws_url) => {
            info!("Chrome DevTools ready at {}", ws_url);
            Ok(LaunchedBrowser { child, endpoint })
        }
        Err(e) => {
            let mut child = child;
            if let Err(kill_err) = child.kill().await {
                warn!("Failed to kill Chrome after bad launch: {}", kill_err);
            }
            Err(e)
        }
    }
}

fn spawn_process(config: &BrowserConfig, args: &[String]) -> Result<Child> {
    let candidates: Vec<String> = match &config.chrome_path {
        Some(path) => vec![path.clone()],
        None => CHROME_CANDIDATES.iter().map(|s| s.to_string()).collect(),
    };

    for candidate in &candidates {
        match Command::new(candidate)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => {
                info!(
                    "Launched {} with remote debugging on port {}",
                    candidate, config.debug_port
                );
                return Ok(child);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Chrome candidate not found: {}", candidate);
            }
            Err(e) => {
                return Err(Error::launch(format!(
                    "Failed to spawn {}: {}",
                    candidate, e
                )));
            }
        }
    }

    Err(Error::launch(
        "No Chrome executable found; set browser.chrome_path or KSS_CHROME_PATH",
    ))
}

/// Poll /json/version until the endpoint answers with a WebSocket URL
async fn wait_for_endpoint(port: u16) -> Result<String> {
    let url = format!("http://127.0.0.1:{}/json/version", port);
    let client = reqwest::Client::new();

    for attempt in 1..=ENDPOINT_ATTEMPTS {
        tokio::time::sleep(ENDPOINT_RETRY_DELAY).await;

        match client.get(&url).send().await {
            Ok(response) => match response.json::<serde_json::Value>().await {
                Ok(json) => {
                    if let Some(ws_url) = json.get("webSocketDebuggerUrl").and_then(|v| v.as_str())
                    {
                        debug!("DevTools endpoint ready after {} attempt(s)", attempt);
                        return Ok(ws_url.to_string());
                    }
                    debug!("DevTools version response missing WebSocket URL");
                }
                Err(e) => debug!("DevTools version response unreadable: {}", e),
            },
            Err(e) => {
                debug!("DevTools endpoint not ready (attempt {}): {}", attempt, e);
            }
        }
    }

    Err(Error::launch(format!(
        "DevTools endpoint on port {} did not come up",
        port
    )))
}
