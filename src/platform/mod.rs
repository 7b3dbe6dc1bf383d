//! Platform adapters.
//!
//! Each adapter owns the full analysis flow for one platform: URL
//! validation, navigation, settling, best-effort page interactions and
//! rule-driven extraction of every section into an [`AnalysisRecord`].
//! The selector chains themselves live in per-platform rule tables, so
//! markup changes are rule edits, not flow edits.

pub mod tistory;
pub mod youtube;

use std::fmt;

use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::AnalysisRecord;
use crate::session::{Session, Tab};

/// Platforms the analyzer can recognize in a URL.
///
/// Recognition is wider than support: Naver blogs, Instagram and Coupang
/// are detected so callers get a precise error, but no adapter exists for
/// them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Tistory,
    NaverBlog,
    Youtube,
    Instagram,
    Coupang,
    Unknown,
}

impl Platform {
    /// Stable lowercase tag used in records and batch items.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Tistory => "tistory",
            Platform::NaverBlog => "naver_blog",
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Coupang => "coupang",
            Platform::Unknown => "unknown",
        }
    }

    /// Parses a batch item tag back into a platform.
    pub fn from_name(name: &str) -> Platform {
        match name {
            "tistory" => Platform::Tistory,
            "naver_blog" => Platform::NaverBlog,
            "youtube" => Platform::Youtube,
            "instagram" => Platform::Instagram,
            "coupang" => Platform::Coupang,
            _ => Platform::Unknown,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies the platform a URL belongs to by its hostname.
pub fn detect_platform(url: &str) -> Platform {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return Platform::Unknown,
    };
    let host = match parsed.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return Platform::Unknown,
    };

    if host.contains("tistory.com") {
        Platform::Tistory
    } else if host.contains("blog.naver.com") {
        Platform::NaverBlog
    } else if host.contains("youtube.com") || host.contains("youtu.be") {
        Platform::Youtube
    } else if host.contains("instagram.com") {
        Platform::Instagram
    } else if host.contains("coupang.com") {
        Platform::Coupang
    } else {
        Platform::Unknown
    }
}

/// Analyzes a URL on whichever platform it belongs to.
///
/// Unsupported platforms fail here, before any browser resource is touched.
pub async fn analyze(session: &mut Session, config: &Config, url: &str) -> Result<AnalysisRecord> {
    dispatch(session, config, detect_platform(url), url).await
}

/// Routes one analysis to the adapter for an already-determined platform.
pub(crate) async fn dispatch(
    session: &mut Session,
    config: &Config,
    platform: Platform,
    url: &str,
) -> Result<AnalysisRecord> {
    match platform {
        Platform::Tistory => tistory::analyze(session, config, url).await,
        Platform::Youtube => youtube::analyze_channel(session, config, url).await,
        other => Err(Error::unsupported_platform(other.name())),
    }
}

/// Rejects URLs the `url` crate cannot parse.
pub(crate) fn validate_url(url: &str) -> Result<()> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|_| Error::validation(url))
}

/// Clicks the first match of `selector` if one exists.
///
/// Interactions are best effort: a missing element or a failed click is a
/// normal outcome on a page variant without that control.
pub(crate) async fn try_click(tab: &Tab, selector: &str) -> bool {
    match tab.click_first(selector).await {
        Ok(clicked) => clicked,
        Err(e) => {
            debug!("Click on '{}' failed: {}", selector, e);
            false
        }
    }
}

/// Releases a tab without letting a release failure mask the original error.
pub(crate) async fn release_quietly(session: &mut Session, tab_id: &str) {
    if let Err(e) = session.release_tab(tab_id).await {
        warn!("Failed to release tab '{}': {}", tab_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_tistory() {
        assert_eq!(detect_platform("https://myblog.tistory.com"), Platform::Tistory);
        assert_eq!(
            detect_platform("https://myblog.tistory.com/entry/hello-world"),
            Platform::Tistory
        );
    }

    #[test]
    fn test_detect_youtube() {
        assert_eq!(
            detect_platform("https://www.youtube.com/@somechannel"),
            Platform::Youtube
        );
        assert_eq!(detect_platform("https://youtu.be/dQw4w9WgXcQ"), Platform::Youtube);
    }

    #[test]
    fn test_detect_recognized_but_unsupported() {
        assert_eq!(
            detect_platform("https://blog.naver.com/someone/223"),
            Platform::NaverBlog
        );
        assert_eq!(
            detect_platform("https://www.instagram.com/someone"),
            Platform::Instagram
        );
        assert_eq!(
            detect_platform("https://www.coupang.com/vp/products/1"),
            Platform::Coupang
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_platform("https://example.com/page"), Platform::Unknown);
        assert_eq!(detect_platform("not a url at all"), Platform::Unknown);
        assert_eq!(detect_platform(""), Platform::Unknown);
    }

    #[test]
    fn test_platform_names_round_trip() {
        for platform in [
            Platform::Tistory,
            Platform::NaverBlog,
            Platform::Youtube,
            Platform::Instagram,
            Platform::Coupang,
            Platform::Unknown,
        ] {
            assert_eq!(Platform::from_name(platform.name()), platform);
        }
        assert_eq!(Platform::from_name("myspace"), Platform::Unknown);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://myblog.tistory.com").is_ok());
        assert!(matches!(
            validate_url("definitely not a url"),
            Err(Error::Validation(_))
        ));
    }
}
