//! Tistory blog adapter.
//!
//! Tistory themes vary wildly, so every field is a fallback chain over the
//! selectors seen across common themes and the stat fields additionally try
//! Korean and English label patterns against the page body.

use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{Extractor, FieldRule, ListRule, Strategy, Transform};
use crate::error::Result;
use crate::platform::{release_quietly, validate_url, Platform};
use crate::record::{section_list, AnalysisRecord};
use crate::session::{navigator, Session, Tab};

/// Tab name for per-post drill-downs, kept separate from the channel tab.
const DETAIL_TAB: &str = "post-detail";

/// Render settle time after navigation reports ready.
const SETTLE_DELAY: Duration = Duration::from_millis(2000);
const DETAIL_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Popular-post sections are short sidebar widgets.
const POPULAR_LIMIT: usize = 5;

/// Analyzes a Tistory blog: info, stats, recent posts and popular posts.
pub async fn analyze(session: &mut Session, config: &Config, url: &str) -> Result<AnalysisRecord> {
    info!("Starting Tistory blog analysis: {}", url);
    validate_url(url)?;

    let tab = session.acquire_tab("default").await?;
    if let Err(e) = navigator::goto(&tab, url).await {
        warn!("Tistory navigation failed: {}", e);
        release_quietly(session, "default").await;
        return Err(e);
    }
    sleep(SETTLE_DELAY).await;

    match collect_record(&tab, config, url).await {
        Ok(record) => {
            info!("Tistory blog analysis complete: {}", url);
            Ok(record)
        }
        Err(e) => {
            release_quietly(session, "default").await;
            Err(e)
        }
    }
}

async fn collect_record(tab: &Tab, config: &Config, url: &str) -> Result<AnalysisRecord> {
    let extractor = Extractor::new(tab).with_base_url(url);

    let blog_info = extractor.extract_fields(&blog_info_rules()).await?;
    let stats = extractor.extract_fields(&stats_rules()).await?;
    let recent_posts = extractor
        .extract_list(&recent_posts_rule(config.tistory.max_posts))
        .await?;
    info!("Collected {} recent posts", recent_posts.len());
    let popular_posts = extractor.extract_list(&popular_posts_rule()).await?;
    info!("Collected {} popular posts", popular_posts.len());

    Ok(AnalysisRecord::new(Platform::Tistory.name(), url)
        .with_section("blog_info", Value::Object(blog_info))
        .with_section("stats", Value::Object(stats))
        .with_section("recent_posts", section_list(recent_posts))
        .with_section("popular_posts", section_list(popular_posts)))
}

/// Analyzes a single post on its own tab. The tab is released whether or
/// not extraction succeeds.
pub async fn post_details(session: &mut Session, url: &str) -> Result<Map<String, Value>> {
    info!("Starting Tistory post analysis: {}", url);
    validate_url(url)?;

    let tab = session.acquire_tab(DETAIL_TAB).await?;
    if let Err(e) = navigator::goto(&tab, url).await {
        release_quietly(session, DETAIL_TAB).await;
        return Err(e);
    }
    sleep(DETAIL_SETTLE_DELAY).await;

    let extractor = Extractor::new(&tab).with_base_url(url);
    let details = extractor.extract_fields(&post_detail_rules()).await;
    release_quietly(session, DETAIL_TAB).await;
    details
}

fn blog_info_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new("title", json!("Unknown"))
            .strategy(Strategy::text("h1"))
            .strategy(Strategy::text(".blog_title"))
            .strategy(Strategy::text(".title")),
        FieldRule::new("description", json!(""))
            .strategy(Strategy::text(".blog_desc"))
            .strategy(Strategy::text(".description"))
            .strategy(Strategy::attr(r#"meta[name="description"]"#, "content")),
        // No reliable theme marker exists; a stylesheet link at least
        // distinguishes themed blogs from the bare default.
        FieldRule::new("theme", json!("default"))
            .strategy(Strategy::constant(r#"link[rel="stylesheet"]"#, json!("custom"))),
    ]
}

fn stats_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new("total_posts", json!(0))
            .strategy(Strategy::capture("body", r"(?i)포스팅?[:\s]*([0-9,]+)"))
            .strategy(Strategy::capture("body", r"(?i)posts?[:\s]*([0-9,]+)"))
            .strategy(Strategy::count(".post, .entry, article"))
            .transform(Transform::ParseCount),
        FieldRule::new("total_visits", json!(0))
            .strategy(Strategy::capture("body", r"(?i)방문자?[:\s]*([0-9,]+)"))
            .strategy(Strategy::capture("body", r"(?i)visits?[:\s]*([0-9,]+)"))
            .transform(Transform::ParseCount),
        FieldRule::new("total_categories", json!(0))
            .strategy(Strategy::count(".category a, .tag a")),
        FieldRule::new("estimated_posts", json!(0))
            .strategy(Strategy::count(".post, .entry, article")),
    ]
}

fn recent_posts_rule(limit: usize) -> ListRule {
    ListRule::new(
        vec![".post, .entry, article, .list_content li"],
        limit,
        vec![
            FieldRule::new("title", json!(""))
                .strategy(Strategy::text("h1"))
                .strategy(Strategy::text("h2"))
                .strategy(Strategy::text("h3"))
                .strategy(Strategy::text(".title"))
                .strategy(Strategy::text(r#"a[href*="/"]"#))
                .required(),
            FieldRule::new("url", json!(""))
                .strategy(Strategy::attr(r#"a[href*="/"]"#, "href"))
                .transform(Transform::ResolveUrl),
            FieldRule::new("date", json!(""))
                .strategy(Strategy::text(".date"))
                .strategy(Strategy::text(".time"))
                .strategy(Strategy::text("time")),
            // Empty selector reads the container's own text.
            FieldRule::new("excerpt", json!(""))
                .strategy(Strategy::text(""))
                .transform(Transform::Truncate(150)),
        ],
    )
}

fn popular_posts_rule() -> ListRule {
    ListRule::new(
        vec![
            ".popular_post",
            ".hot_post",
            ".best_post",
            ".sidebar .post",
            ".widget .post",
        ],
        POPULAR_LIMIT,
        vec![
            FieldRule::new("title", json!(""))
                .strategy(Strategy::text("a"))
                .strategy(Strategy::text(".title"))
                .required(),
            FieldRule::new("url", json!(""))
                .strategy(Strategy::attr("a", "href"))
                .strategy(Strategy::attr(".title", "href"))
                .transform(Transform::ResolveUrl),
            FieldRule::new("views", json!("0"))
                .strategy(Strategy::text(".view"))
                .strategy(Strategy::text(".count")),
        ],
    )
}

fn post_detail_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new("title", json!(""))
            .strategy(Strategy::text("h1"))
            .strategy(Strategy::text(".title"))
            .strategy(Strategy::text(".post_title")),
        FieldRule::new("content_length", json!(0))
            .strategy(Strategy::text_len(".post_content"))
            .strategy(Strategy::text_len(".entry"))
            .strategy(Strategy::text_len(".content")),
        FieldRule::new("date", json!(""))
            .strategy(Strategy::text(".date"))
            .strategy(Strategy::text("time")),
        FieldRule::new("tags", json!([]))
            .strategy(Strategy::text_list(".tag a, .tags a")),
        FieldRule::new("views", json!("0"))
            .strategy(Strategy::text(".view_count"))
            .strategy(Strategy::text(".views")),
        FieldRule::new("comments", json!("0"))
            .strategy(Strategy::text(".comment_count"))
            .strategy(Strategy::text(".comments")),
    ]
}
