//! Declarative extraction rules.
//!
//! A field is described by an ordered list of strategies. The first strategy
//! that yields a usable value wins and later ones are never consulted. Every
//! field carries a default, so extracted records are always fully populated
//! even when the page matches nothing.

use serde_json::Value;

/// How to read a value out of a matched element.
#[derive(Debug, Clone)]
pub enum Accessor {
    /// Trimmed text content. Empty text counts as a miss.
    Text,
    /// Trimmed text of every match, collected into an array.
    TextList,
    /// Character count of the full text content.
    TextLen,
    /// A named attribute, as written in the markup. Absent or empty counts
    /// as a miss.
    Attr(&'static str),
    /// Number of elements matching the selector. Zero counts as a miss.
    Count,
    /// Fixed value, emitted whenever the selector matches at least one
    /// element.
    Const(Value),
    /// First capture group of the pattern, applied to the element text.
    Capture(&'static str),
}

/// One selector paired with an accessor.
///
/// An empty selector addresses the enclosing list item itself, which is only
/// meaningful inside a [`ListRule`].
#[derive(Debug, Clone)]
pub struct Strategy {
    pub selector: &'static str,
    pub accessor: Accessor,
}

impl Strategy {
    pub fn text(selector: &'static str) -> Self {
        Self { selector, accessor: Accessor::Text }
    }

    pub fn text_list(selector: &'static str) -> Self {
        Self { selector, accessor: Accessor::TextList }
    }

    pub fn text_len(selector: &'static str) -> Self {
        Self { selector, accessor: Accessor::TextLen }
    }

    pub fn attr(selector: &'static str, name: &'static str) -> Self {
        Self { selector, accessor: Accessor::Attr(name) }
    }

    pub fn count(selector: &'static str) -> Self {
        Self { selector, accessor: Accessor::Count }
    }

    pub fn constant(selector: &'static str, value: Value) -> Self {
        Self { selector, accessor: Accessor::Const(value) }
    }

    pub fn capture(selector: &'static str, pattern: &'static str) -> Self {
        Self { selector, accessor: Accessor::Capture(pattern) }
    }
}

/// Post-processing applied to a winning strategy's value.
#[derive(Debug, Clone)]
pub enum Transform {
    /// Parse the value as a Korean-formatted count. Numbers pass through.
    ParseCount,
    /// Keep at most this many characters.
    Truncate(usize),
    /// Prefix the origin onto values that are not already absolute URLs.
    PrependHost(&'static str),
    /// Resolve the value against the page URL.
    ResolveUrl,
}

/// One record field: named, with fallback strategies and a default.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pub strategies: Vec<Strategy>,
    pub transform: Option<Transform>,
    pub default: Value,
    /// Only honored inside a [`ListRule`]: items missing a required field
    /// are dropped instead of defaulted.
    pub required: bool,
}

impl FieldRule {
    pub fn new(name: &'static str, default: Value) -> Self {
        Self {
            name,
            strategies: Vec::new(),
            transform: None,
            default,
            required: false,
        }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A repeated-item section: container candidates plus per-item fields.
#[derive(Debug, Clone)]
pub struct ListRule {
    /// Container selectors tried in order; the first with any matches wins.
    pub containers: Vec<&'static str>,
    /// Hard cap on extracted items.
    pub limit: usize,
    pub fields: Vec<FieldRule>,
}

impl ListRule {
    pub fn new(containers: Vec<&'static str>, limit: usize, fields: Vec<FieldRule>) -> Self {
        Self { containers, limit, fields }
    }
}
