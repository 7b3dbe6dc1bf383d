//! Configuration management for KSS

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Analyzer configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Browser process and tab settings
    pub browser: BrowserConfig,

    /// Tistory adapter settings
    pub tistory: TistoryConfig,

    /// YouTube adapter settings
    pub youtube: YoutubeConfig,

    /// Batch pacing settings
    pub batch: BatchConfig,

    /// Output settings (consumed by the CLI, not the core)
    pub output: OutputConfig,
}

/// Browser process and per-tab configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run Chrome headless
    pub headless: bool,

    /// Default navigation timeout in milliseconds
    pub timeout_ms: u64,

    /// Viewport width in pixels
    pub viewport_width: u32,

    /// Viewport height in pixels
    pub viewport_height: u32,

    /// Abort stylesheet and font requests to reduce load time
    pub block_resources: bool,

    /// Chrome executable path; resolved from well-known locations when unset
    pub chrome_path: Option<String>,

    /// Remote debugging port for the spawned Chrome process
    pub debug_port: u16,

    /// User agent override applied to every tab when set
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_ms: 30000,
            viewport_width: 1920,
            viewport_height: 1080,
            block_resources: true,
            chrome_path: None,
            debug_port: 9222,
            user_agent: None,
        }
    }
}

/// Tistory adapter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TistoryConfig {
    /// Maximum recent posts collected per analysis
    pub max_posts: usize,
}

impl Default for TistoryConfig {
    fn default() -> Self {
        Self { max_posts: 10 }
    }
}

/// YouTube adapter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Maximum recent videos collected per analysis
    pub max_videos: usize,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self { max_videos: 10 }
    }
}

/// Batch pacing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Lower bound of the randomized inter-item delay in milliseconds
    pub delay_min_ms: u64,

    /// Upper bound of the randomized inter-item delay in milliseconds
    pub delay_max_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_min_ms: 2000,
            delay_max_ms: 5000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory where the CLI writes result files
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "./data".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(headless) = env::var("KSS_HEADLESS") {
            self.browser.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid KSS_HEADLESS"))?;
        }

        if let Ok(timeout) = env::var("KSS_TIMEOUT_MS") {
            self.browser.timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid KSS_TIMEOUT_MS"))?;
        }

        if let Ok(chrome_path) = env::var("KSS_CHROME_PATH") {
            self.browser.chrome_path = Some(chrome_path);
        }

        if let Ok(port) = env::var("KSS_DEBUG_PORT") {
            self.browser.debug_port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid KSS_DEBUG_PORT"))?;
        }

        if let Ok(user_agent) = env::var("KSS_USER_AGENT") {
            self.browser.user_agent = Some(user_agent);
        }

        if let Ok(block) = env::var("KSS_BLOCK_RESOURCES") {
            self.browser.block_resources = block
                .parse()
                .map_err(|_| Error::configuration("Invalid KSS_BLOCK_RESOURCES"))?;
        }

        if let Ok(delay_min) = env::var("KSS_DELAY_MIN_MS") {
            self.batch.delay_min_ms = delay_min
                .parse()
                .map_err(|_| Error::configuration("Invalid KSS_DELAY_MIN_MS"))?;
        }

        if let Ok(delay_max) = env::var("KSS_DELAY_MAX_MS") {
            self.batch.delay_max_ms = delay_max
                .parse()
                .map_err(|_| Error::configuration("Invalid KSS_DELAY_MAX_MS"))?;
        }

        if let Ok(dir) = env::var("KSS_OUTPUT_DIR") {
            self.output.dir = dir;
        }

        Ok(())
    }
}
