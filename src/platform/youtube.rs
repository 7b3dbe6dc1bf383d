//! YouTube channel adapter.
//!
//! Channel pages are tabbed, so the flow interleaves extraction with tab
//! switches: channel header first, then the about tab for stats, the videos
//! tab for uploads and the popular tab when present. Selectors cover both
//! Korean and English page variants, matching on aria-labels where YouTube
//! localizes tab names.

use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{Extractor, FieldRule, ListRule, Strategy, Transform};
use crate::error::Result;
use crate::platform::{release_quietly, try_click, validate_url, Platform};
use crate::record::{section_list, AnalysisRecord};
use crate::session::{navigator, Session, Tab};

/// Tab name for per-video drill-downs.
const DETAIL_TAB: &str = "video-detail";

/// YouTube renders incrementally well past document-ready.
const SETTLE_DELAY: Duration = Duration::from_millis(3000);
const INTERACTION_DELAY: Duration = Duration::from_millis(2000);
const CONSENT_DELAY: Duration = Duration::from_millis(1000);
const DETAIL_SETTLE_DELAY: Duration = Duration::from_millis(3000);

const POPULAR_LIMIT: usize = 5;

/// Origin prepended to the relative watch URLs in video grids.
const YOUTUBE_ORIGIN: &str = "https://youtube.com";

const CONSENT_BUTTON: &str =
    r#"button[aria-label*="Accept"], button[aria-label*="수락"], [aria-label*="모두 수락"]"#;
const ABOUT_TAB: &str =
    r#"tp-yt-paper-tab[aria-label*="정보"], tp-yt-paper-tab[aria-label*="About"]"#;
const VIDEOS_TAB: &str =
    r#"tp-yt-paper-tab[aria-label*="동영상"], tp-yt-paper-tab[aria-label*="Videos"]"#;
const POPULAR_TAB: &str =
    r#"tp-yt-paper-tab[aria-label*="인기"], tp-yt-paper-tab[aria-label*="Popular"]"#;

/// Analyzes a YouTube channel: header info, stats, recent and popular videos.
pub async fn analyze_channel(
    session: &mut Session,
    config: &Config,
    url: &str,
) -> Result<AnalysisRecord> {
    info!("Starting YouTube channel analysis: {}", url);
    validate_url(url)?;

    let tab = session.acquire_tab("default").await?;
    if let Err(e) = navigator::goto(&tab, url).await {
        warn!("YouTube navigation failed: {}", e);
        release_quietly(session, "default").await;
        return Err(e);
    }
    sleep(SETTLE_DELAY).await;
    dismiss_consent(&tab).await;

    match collect_record(&tab, config, url).await {
        Ok(record) => {
            info!("YouTube channel analysis complete: {}", url);
            Ok(record)
        }
        Err(e) => {
            release_quietly(session, "default").await;
            Err(e)
        }
    }
}

async fn collect_record(tab: &Tab, config: &Config, url: &str) -> Result<AnalysisRecord> {
    let extractor = Extractor::new(tab);

    let channel_info = extractor.extract_fields(&channel_info_rules()).await?;

    // Stats live on the about tab but some layouts inline them, so the
    // extraction runs whether or not the tab switch landed.
    switch_tab(tab, ABOUT_TAB).await;
    let stats = extractor.extract_fields(&stats_rules()).await?;

    switch_tab(tab, VIDEOS_TAB).await;
    let recent_videos = extractor
        .extract_list(&recent_videos_rule(config.youtube.max_videos))
        .await?;
    info!("Collected {} recent videos", recent_videos.len());

    // Without the popular tab the grid still shows the videos tab's
    // content, which must not be reported as a popularity ranking.
    let popular_videos = if switch_tab(tab, POPULAR_TAB).await {
        let videos = extractor.extract_list(&popular_videos_rule()).await?;
        info!("Collected {} popular videos", videos.len());
        videos
    } else {
        debug!("Popular tab not found, skipping popular videos");
        Vec::new()
    };

    Ok(AnalysisRecord::new(Platform::Youtube.name(), url)
        .with_section("channel_info", Value::Object(channel_info))
        .with_section("stats", Value::Object(stats))
        .with_section("recent_videos", section_list(recent_videos))
        .with_section("popular_videos", section_list(popular_videos)))
}

/// Analyzes a single video on its own tab. The tab is released whether or
/// not extraction succeeds.
pub async fn video_details(session: &mut Session, url: &str) -> Result<Map<String, Value>> {
    info!("Starting YouTube video analysis: {}", url);
    validate_url(url)?;

    let tab = session.acquire_tab(DETAIL_TAB).await?;
    if let Err(e) = navigator::goto(&tab, url).await {
        release_quietly(session, DETAIL_TAB).await;
        return Err(e);
    }
    sleep(DETAIL_SETTLE_DELAY).await;

    let extractor = Extractor::new(&tab);
    let details = extractor.extract_fields(&video_detail_rules()).await;
    release_quietly(session, DETAIL_TAB).await;
    details
}

async fn dismiss_consent(tab: &Tab) {
    if try_click(tab, CONSENT_BUTTON).await {
        debug!("Dismissed consent dialog");
        sleep(CONSENT_DELAY).await;
    }
}

/// Clicks a channel tab and waits for its content to render.
async fn switch_tab(tab: &Tab, selector: &str) -> bool {
    if try_click(tab, selector).await {
        sleep(INTERACTION_DELAY).await;
        true
    } else {
        false
    }
}

fn channel_info_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new("name", json!("Unknown"))
            .strategy(Strategy::text("#text.ytd-channel-name"))
            .strategy(Strategy::text(".ytd-channel-name #text")),
        FieldRule::new("subscribers", json!("0"))
            .strategy(Strategy::text("#subscriber-count"))
            .strategy(Strategy::text(".ytd-c4-tabbed-header-renderer #subscriber-count")),
        FieldRule::new("description", json!(""))
            .strategy(Strategy::text("#description"))
            .strategy(Strategy::text(".ytd-channel-about-metadata-renderer #description")),
        FieldRule::new("avatar_url", json!(""))
            .strategy(Strategy::attr("#avatar img", "src"))
            .strategy(Strategy::attr(".ytd-c4-tabbed-header-renderer img", "src")),
    ]
}

// querySelector rejects the :contains pseudo-class, so those strategies
// always miss and their fields default. No stable selector for the
// localized stat rows is known.
fn stats_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new("subscribers_count", json!(0))
            .strategy(Strategy::text("#subscriber-count"))
            .transform(Transform::ParseCount),
        FieldRule::new("total_views", json!("0"))
            .strategy(Strategy::text(
                r#".ytd-channel-about-metadata-renderer .style-scope:contains("조회수")"#,
            ))
            .strategy(Strategy::text(
                r#".ytd-channel-about-metadata-renderer .style-scope:contains("views")"#,
            )),
        FieldRule::new("joined_date", json!(""))
            .strategy(Strategy::text(
                r#".ytd-channel-about-metadata-renderer .style-scope:contains("가입일")"#,
            ))
            .strategy(Strategy::text(
                r#".ytd-channel-about-metadata-renderer .style-scope:contains("Joined")"#,
            )),
        FieldRule::new("video_count", json!(0))
            .strategy(Strategy::count(".ytd-grid-video-renderer")),
    ]
}

fn recent_videos_rule(limit: usize) -> ListRule {
    ListRule::new(
        vec![".ytd-grid-video-renderer, .ytd-rich-item-renderer"],
        limit,
        vec![
            FieldRule::new("title", json!(""))
                .strategy(Strategy::text("#video-title"))
                .strategy(Strategy::text(".ytd-video-meta-block #video-title"))
                .required(),
            FieldRule::new("url", json!(""))
                .strategy(Strategy::attr("#video-title", "href"))
                .transform(Transform::PrependHost(YOUTUBE_ORIGIN)),
            FieldRule::new("views", json!("0"))
                .strategy(Strategy::text(
                    r#".ytd-video-meta-block .style-scope:contains("조회수")"#,
                ))
                .strategy(Strategy::text(
                    r#".ytd-video-meta-block .style-scope:contains("views")"#,
                )),
            FieldRule::new("upload_date", json!(""))
                .strategy(Strategy::text(
                    r#".ytd-video-meta-block .style-scope:contains("전")"#,
                ))
                .strategy(Strategy::text(
                    r#".ytd-video-meta-block .style-scope:contains("ago")"#,
                )),
            FieldRule::new("thumbnail", json!(""))
                .strategy(Strategy::attr("img", "src")),
        ],
    )
}

fn popular_videos_rule() -> ListRule {
    ListRule::new(
        vec![".ytd-grid-video-renderer"],
        POPULAR_LIMIT,
        vec![
            FieldRule::new("title", json!(""))
                .strategy(Strategy::text("#video-title"))
                .required(),
            FieldRule::new("url", json!(""))
                .strategy(Strategy::attr("#video-title", "href"))
                .transform(Transform::PrependHost(YOUTUBE_ORIGIN)),
            FieldRule::new("views", json!("0"))
                .strategy(Strategy::text(".ytd-video-meta-block .style-scope")),
        ],
    )
}

fn video_detail_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new("title", json!(""))
            .strategy(Strategy::text("h1.ytd-video-primary-info-renderer"))
            .strategy(Strategy::text(".ytd-video-primary-info-renderer h1")),
        FieldRule::new("views", json!("0"))
            .strategy(Strategy::text(".ytd-video-view-count-renderer"))
            .strategy(Strategy::text(".view-count")),
        FieldRule::new("likes", json!("0"))
            .strategy(Strategy::attr(r#"button[aria-label*="좋아요"]"#, "aria-label"))
            .strategy(Strategy::attr(r#"button[aria-label*="like"]"#, "aria-label")),
        FieldRule::new("description", json!(""))
            .strategy(Strategy::text(".ytd-video-secondary-info-renderer #description"))
            .transform(Transform::Truncate(500)),
        FieldRule::new("channel", json!(""))
            .strategy(Strategy::text(".ytd-video-owner-renderer .ytd-channel-name a")),
        FieldRule::new("upload_date", json!(""))
            .strategy(Strategy::text(".ytd-video-secondary-info-renderer #info-strings")),
    ]
}
