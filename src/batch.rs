//! Batch orchestration over multiple URLs.
//!
//! One item's failure never touches its neighbors: each becomes an error
//! outcome and the batch carries on. Items run strictly in input order on
//! the shared session, with a randomized pacing delay between consecutive
//! items to avoid hammering the platforms.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, Config};
use crate::error::Result;
use crate::platform::{self, detect_platform, Platform};
use crate::record::{AnalysisRecord, BatchOutcome};
use crate::session::Session;

/// One batch entry: a platform tag paired with the URL to analyze.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub platform: Platform,
    pub url: String,
}

impl BatchItem {
    pub fn new<U: Into<String>>(platform: Platform, url: U) -> Self {
        Self {
            platform,
            url: url.into(),
        }
    }
}

/// Routes one item to its platform adapter.
#[async_trait]
pub trait Dispatcher {
    async fn dispatch(&mut self, platform: Platform, url: &str) -> Result<AnalysisRecord>;
}

/// Production dispatcher backed by a live session.
pub struct SessionDispatcher<'a> {
    session: &'a mut Session,
    config: &'a Config,
}

impl<'a> SessionDispatcher<'a> {
    pub fn new(session: &'a mut Session, config: &'a Config) -> Self {
        Self { session, config }
    }
}

#[async_trait]
impl Dispatcher for SessionDispatcher<'_> {
    async fn dispatch(&mut self, platform: Platform, url: &str) -> Result<AnalysisRecord> {
        platform::dispatch(self.session, self.config, platform, url).await
    }
}

/// Analyzes a list of URLs, detecting each one's platform from its host.
pub async fn batch_analyze(
    session: &mut Session,
    config: &Config,
    urls: &[String],
) -> Vec<BatchOutcome> {
    let items: Vec<BatchItem> = urls
        .iter()
        .map(|url| BatchItem::new(detect_platform(url), url.clone()))
        .collect();
    let mut dispatcher = SessionDispatcher::new(session, config);
    run_batch(&mut dispatcher, &config.batch, &items).await
}

/// Runs every item in input order through the dispatcher.
///
/// The output holds exactly one outcome per item, in the same order. The
/// pacing delay applies between items whether the previous one succeeded
/// or failed; an unknown platform tag turns into an error outcome without
/// reaching any adapter.
pub async fn run_batch<D: Dispatcher>(
    dispatcher: &mut D,
    pacing: &BatchConfig,
    items: &[BatchItem],
) -> Vec<BatchOutcome> {
    info!("Starting batch analysis of {} items", items.len());

    let mut outcomes = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        info!("[{}/{}] Analyzing {}", index + 1, items.len(), item.url);

        let outcome = match dispatcher.dispatch(item.platform, &item.url).await {
            Ok(record) => BatchOutcome::Success(record),
            Err(e) => {
                warn!("Analysis of {} failed: {}", item.url, e);
                BatchOutcome::failure(item.url.clone(), e.to_string())
            }
        };
        outcomes.push(outcome);

        if index + 1 < items.len() {
            pace(pacing).await;
        }
    }

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!("Batch complete: {}/{} succeeded", succeeded, outcomes.len());
    outcomes
}

/// Sleeps a random duration inside the configured pacing window.
async fn pace(pacing: &BatchConfig) {
    let min = pacing.delay_min_ms.min(pacing.delay_max_ms);
    let max = pacing.delay_min_ms.max(pacing.delay_max_ms);
    let delay = rand::thread_rng().gen_range(min..=max);
    debug!("Pacing for {}ms before the next item", delay);
    sleep(Duration::from_millis(delay)).await;
}
