//! Text and number normalization shared by the extraction rules.

use std::sync::LazyLock;

use regex::Regex;

/// First run of digits, commas and dots, e.g. the "1.5" in "구독자 1.5만명".
static NUMBER_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9][0-9,.]*").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Parses a Korean-formatted count such as "1.5만" or "조회수 2,345회".
///
/// `만` scales the number by 10,000 and `천` by 1,000. Commas are read as
/// thousands separators. Input with no parsable number yields 0.
pub fn parse_count(text: &str) -> i64 {
    let multiplier = if text.contains('만') {
        10_000.0
    } else if text.contains('천') {
        1_000.0
    } else {
        1.0
    };

    let run = match NUMBER_RUN.find(text) {
        Some(run) => run,
        None => return 0,
    };

    match run.as_str().replace(',', "").parse::<f64>() {
        Ok(value) => (value * multiplier).floor() as i64,
        Err(_) => 0,
    }
}

/// Collapses whitespace runs into single spaces and trims the ends.
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Caps `text` at `max_length` characters, marking the cut with an ellipsis.
/// The result never exceeds `max_length` characters in total.
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Caps `text` at `max_length` characters with no ellipsis marker.
pub fn cut_text(text: &str, max_length: usize) -> String {
    text.chars().take(max_length).collect()
}
