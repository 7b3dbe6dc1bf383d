//! Shared fixtures for integration tests.
//!
//! [`StaticDom`] answers the extraction engine's selector queries from a
//! fixed HTML string, so rule behavior is testable without a browser.

use std::collections::HashMap;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use kss::engine::{ElementSnapshot, PageQuery};
use kss::error::{Error, Result};

/// In-memory document backing a [`PageQuery`].
///
/// `scraper`'s parsed tree is not `Send`, so the HTML is kept as a string
/// and re-parsed inside each query. Fixtures are small enough that this
/// never shows up in test times.
pub struct StaticDom {
    html: String,
}

impl StaticDom {
    pub fn new<S: Into<String>>(html: S) -> Self {
        Self { html: html.into() }
    }

    /// Parses a selector, mapping rejection to the same error a browser
    /// raises for selectors `querySelector` refuses.
    fn selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector).map_err(|e| {
            Error::script_execution_failed(format!("selector '{}' rejected: {}", selector, e))
        })
    }

    fn snapshot(selector: &str, index: usize, element: ElementRef<'_>) -> ElementSnapshot {
        let text = element.text().collect::<String>().trim().to_string();
        let attrs: HashMap<String, String> = element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        ElementSnapshot {
            selector: selector.to_string(),
            index,
            text,
            attrs,
        }
    }

    fn find_all(&self, selector: &str, limit: usize) -> Result<Vec<ElementSnapshot>> {
        let parsed = Self::selector(selector)?;
        let document = Html::parse_document(&self.html);
        Ok(document
            .select(&parsed)
            .take(limit)
            .enumerate()
            .map(|(index, element)| Self::snapshot(selector, index, element))
            .collect())
    }

    fn find_within(
        &self,
        scope: &ElementSnapshot,
        selector: &str,
    ) -> Result<Option<ElementSnapshot>> {
        let scope_parsed = Self::selector(&scope.selector)?;
        let child_parsed = Self::selector(selector)?;
        let document = Html::parse_document(&self.html);
        let container = match document.select(&scope_parsed).nth(scope.index) {
            Some(container) => container,
            None => return Ok(None),
        };
        Ok(container
            .select(&child_parsed)
            .next()
            .map(|element| Self::snapshot(selector, 0, element)))
    }

    fn count_matches(&self, selector: &str) -> Result<usize> {
        let parsed = Self::selector(selector)?;
        let document = Html::parse_document(&self.html);
        Ok(document.select(&parsed).count())
    }
}

#[async_trait]
impl PageQuery for StaticDom {
    async fn query_one(&self, selector: &str) -> Result<Option<ElementSnapshot>> {
        Ok(self.find_all(selector, 1)?.into_iter().next())
    }

    async fn query_all(&self, selector: &str, limit: usize) -> Result<Vec<ElementSnapshot>> {
        self.find_all(selector, limit)
    }

    async fn query_within(
        &self,
        scope: &ElementSnapshot,
        selector: &str,
    ) -> Result<Option<ElementSnapshot>> {
        self.find_within(scope, selector)
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.count_matches(selector)
    }
}
