//! Selector query surface consumed by the extraction engine.
//!
//! A [`PageQuery`] implementation answers CSS selector queries with plain
//! data snapshots. The rule engine only ever sees snapshots, which keeps it
//! independent of whether the document lives in a browser tab or in a
//! statically parsed fixture.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// Plain-data capture of one DOM element at query time.
///
/// A snapshot is re-addressable: `selector` and `index` identify the element
/// within its document, so scoped queries can return to it later.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSnapshot {
    /// Selector that produced this element.
    pub selector: String,
    /// Position of this element within the selector's match list.
    pub index: usize,
    /// Trimmed text content.
    pub text: String,
    /// Attributes as written in the markup.
    pub attrs: HashMap<String, String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Character count of the text content.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Async selector queries against one document.
///
/// Selectors that the underlying engine rejects as invalid surface as
/// [`Error::ScriptExecutionFailed`](crate::error::Error::ScriptExecutionFailed);
/// callers decide whether that is fatal. Other errors mean the document
/// itself is no longer reachable.
#[async_trait]
pub trait PageQuery: Send + Sync {
    /// First element matching `selector`, or `None` when nothing matches.
    async fn query_one(&self, selector: &str) -> Result<Option<ElementSnapshot>>;

    /// Up to `limit` elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str, limit: usize) -> Result<Vec<ElementSnapshot>>;

    /// First descendant of `scope` matching `selector`.
    ///
    /// The scope element is re-addressed by its own selector and index, so
    /// the result reflects the live document even if it changed since the
    /// scope snapshot was taken.
    async fn query_within(
        &self,
        scope: &ElementSnapshot,
        selector: &str,
    ) -> Result<Option<ElementSnapshot>>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize>;
}
