//! Analysis result records.
//!
//! Section names and field names inside a record form the persisted-state
//! contract; external tooling reads the emitted JSON, so they must stay
//! stable across releases.

use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};

/// Wall-clock timestamp in the record format, e.g. "2024-03-01 13:45:10".
pub fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One completed platform analysis.
///
/// Serializes flat: `{ platform, url, analyzed_at, <section>: ..., ... }`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub platform: String,
    pub url: String,
    pub analyzed_at: String,
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

impl AnalysisRecord {
    /// Creates a record stamped with the current local time.
    pub fn new<P: Into<String>, U: Into<String>>(platform: P, url: U) -> Self {
        Self {
            platform: platform.into(),
            url: url.into(),
            analyzed_at: now_stamp(),
            sections: Map::new(),
        }
    }

    /// Adds one named section.
    pub fn with_section<S: Into<String>>(mut self, name: S, value: Value) -> Self {
        self.sections.insert(name.into(), value);
        self
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }
}

/// Wraps extracted list items as a record section value.
pub fn section_list(items: Vec<Map<String, Value>>) -> Value {
    Value::Array(items.into_iter().map(Value::Object).collect())
}

/// Result of one batch item.
///
/// Serializes without a wrapper tag: a success is the full analysis record,
/// a failure is `{ url, error, analyzed_at }`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Success(AnalysisRecord),
    Error {
        url: String,
        error: String,
        analyzed_at: String,
    },
}

impl BatchOutcome {
    /// Creates a failure outcome stamped with the current local time.
    pub fn failure<U: Into<String>, E: Into<String>>(url: U, error: E) -> Self {
        BatchOutcome::Error {
            url: url.into(),
            error: error.into(),
            analyzed_at: now_stamp(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success(_))
    }

    pub fn url(&self) -> &str {
        match self {
            BatchOutcome::Success(record) => &record.url,
            BatchOutcome::Error { url, .. } => url,
        }
    }
}
