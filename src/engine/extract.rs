//! Rule-driven extraction against a [`PageQuery`] surface.
//!
//! Field misses are never errors: a field that no strategy can satisfy falls
//! back to its declared default. The extractor only fails when the document
//! itself has become unreachable, in which case every query would fail and
//! continuing is pointless.

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::engine::normalize::{cut_text, parse_count};
use crate::engine::query::{ElementSnapshot, PageQuery};
use crate::engine::rules::{Accessor, FieldRule, ListRule, Strategy, Transform};
use crate::error::{Error, Result};

/// Cap on elements gathered for a `TextList` accessor.
const TEXT_LIST_LIMIT: usize = 100;

/// Applies field and list rules to one document.
pub struct Extractor<'a> {
    page: &'a dyn PageQuery,
    base_url: Option<Url>,
}

impl<'a> Extractor<'a> {
    pub fn new(page: &'a dyn PageQuery) -> Self {
        Self { page, base_url: None }
    }

    /// Supplies the page URL used by the [`Transform::ResolveUrl`] transform.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Url::parse(url).ok();
        self
    }

    /// Extracts every field in `rules` into one map.
    ///
    /// Each rule's name is always present in the output: the first strategy
    /// producing a usable value wins, otherwise the declared default lands.
    pub async fn extract_fields(&self, rules: &[FieldRule]) -> Result<Map<String, Value>> {
        let mut record = Map::new();
        for rule in rules {
            let value = match self.resolve_field(rule, None).await? {
                Some(value) => value,
                None => {
                    debug!("No strategy matched field '{}', using default", rule.name);
                    rule.default.clone()
                }
            };
            record.insert(rule.name.to_string(), value);
        }
        Ok(record)
    }

    /// Extracts repeated items described by `rule`.
    ///
    /// Container selectors are tried in order and the first with any matches
    /// supplies the items, capped at the rule's limit. Items missing a
    /// required field are dropped; all other fields default like
    /// [`extract_fields`](Self::extract_fields).
    pub async fn extract_list(&self, rule: &ListRule) -> Result<Vec<Map<String, Value>>> {
        let mut containers = Vec::new();
        for selector in &rule.containers {
            containers = self.query_all_forgiving(selector, rule.limit).await?;
            if !containers.is_empty() {
                debug!("Container selector '{}' matched {} items", selector, containers.len());
                break;
            }
        }

        let mut items = Vec::new();
        'containers: for scope in &containers {
            let mut item = Map::new();
            for field in &rule.fields {
                match self.resolve_field(field, Some(scope)).await? {
                    Some(value) => {
                        item.insert(field.name.to_string(), value);
                    }
                    None if field.required => {
                        debug!(
                            "Item {} has no '{}', dropping it",
                            scope.index, field.name
                        );
                        continue 'containers;
                    }
                    None => {
                        item.insert(field.name.to_string(), field.default.clone());
                    }
                }
            }
            items.push(item);
        }
        Ok(items)
    }

    async fn resolve_field(
        &self,
        rule: &FieldRule,
        scope: Option<&ElementSnapshot>,
    ) -> Result<Option<Value>> {
        for strategy in &rule.strategies {
            if let Some(value) = self.apply_strategy(strategy, scope).await? {
                return Ok(Some(self.apply_transform(rule.transform.as_ref(), value)));
            }
        }
        Ok(None)
    }

    async fn apply_strategy(
        &self,
        strategy: &Strategy,
        scope: Option<&ElementSnapshot>,
    ) -> Result<Option<Value>> {
        match &strategy.accessor {
            Accessor::Text => {
                let found = self.locate(strategy.selector, scope).await?;
                Ok(found
                    .filter(|el| !el.text.is_empty())
                    .map(|el| Value::String(el.text)))
            }
            Accessor::TextLen => {
                let found = self.locate(strategy.selector, scope).await?;
                Ok(found.map(|el| Value::from(el.text_len() as u64)))
            }
            Accessor::Attr(name) => {
                let found = self.locate(strategy.selector, scope).await?;
                Ok(found
                    .and_then(|el| el.attr(name).map(str::to_string))
                    .filter(|value| !value.is_empty())
                    .map(Value::String))
            }
            Accessor::TextList => {
                if scope.is_some() {
                    debug!("TextList accessor is document-level only, skipping '{}'", strategy.selector);
                    return Ok(None);
                }
                let elements = self
                    .query_all_forgiving(strategy.selector, TEXT_LIST_LIMIT)
                    .await?;
                if elements.is_empty() {
                    return Ok(None);
                }
                let texts = elements
                    .into_iter()
                    .map(|el| Value::String(el.text))
                    .collect();
                Ok(Some(Value::Array(texts)))
            }
            Accessor::Count => {
                if scope.is_some() {
                    debug!("Count accessor is document-level only, skipping '{}'", strategy.selector);
                    return Ok(None);
                }
                let count = self
                    .forgive(strategy.selector, self.page.count(strategy.selector).await)?;
                if count == 0 {
                    Ok(None)
                } else {
                    Ok(Some(Value::from(count as u64)))
                }
            }
            Accessor::Const(value) => {
                let found = self.locate(strategy.selector, scope).await?;
                Ok(found.map(|_| value.clone()))
            }
            Accessor::Capture(pattern) => {
                let found = match self.locate(strategy.selector, scope).await? {
                    Some(el) => el,
                    None => return Ok(None),
                };
                let regex = match Regex::new(pattern) {
                    Ok(regex) => regex,
                    Err(e) => {
                        debug!("Invalid capture pattern '{}': {}", pattern, e);
                        return Ok(None);
                    }
                };
                Ok(regex
                    .captures(&found.text)
                    .and_then(|captures| captures.get(1))
                    .map(|group| Value::String(group.as_str().to_string())))
            }
        }
    }

    /// Finds the element a strategy addresses, honoring the list scope.
    /// An empty selector inside a scope addresses the scope element itself.
    async fn locate(
        &self,
        selector: &str,
        scope: Option<&ElementSnapshot>,
    ) -> Result<Option<ElementSnapshot>> {
        let result = match scope {
            Some(scope) if selector.is_empty() => return Ok(Some(scope.clone())),
            Some(scope) => self.page.query_within(scope, selector).await,
            None => self.page.query_one(selector).await,
        };
        self.forgive(selector, result)
    }

    async fn query_all_forgiving(
        &self,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<ElementSnapshot>> {
        let result = self.page.query_all(selector, limit).await;
        self.forgive(selector, result)
    }

    /// Downgrades a rejected selector to an empty result. Any other failure
    /// means the document is gone and extraction cannot continue.
    fn forgive<T: Default>(&self, selector: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(Error::ScriptExecutionFailed(reason)) => {
                debug!("Selector '{}' rejected, treating as miss: {}", selector, reason);
                Ok(T::default())
            }
            Err(Error::Engine(reason)) => Err(Error::Engine(reason)),
            Err(other) => Err(Error::engine(other.to_string())),
        }
    }

    fn apply_transform(&self, transform: Option<&Transform>, value: Value) -> Value {
        let transform = match transform {
            Some(transform) => transform,
            None => return value,
        };
        match (transform, value) {
            (Transform::ParseCount, Value::String(text)) => Value::from(parse_count(&text)),
            (Transform::Truncate(max), Value::String(text)) => {
                Value::String(cut_text(&text, *max))
            }
            (Transform::PrependHost(host), Value::String(path)) => {
                if path.is_empty() || path.starts_with("http") {
                    Value::String(path)
                } else {
                    Value::String(format!("{}{}", host, path))
                }
            }
            (Transform::ResolveUrl, Value::String(href)) => {
                let resolved = self
                    .base_url
                    .as_ref()
                    .and_then(|base| base.join(&href).ok())
                    .map(|url| url.to_string());
                Value::String(resolved.unwrap_or(href))
            }
            (_, value) => value,
        }
    }
}
