//! Result persistence for the CLI.
//!
//! Records land as pretty-printed JSON under the configured output
//! directory, with a timestamp suffix so repeated runs never overwrite
//! each other.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::Result;

static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Wall-clock timestamp safe for filenames, e.g. "2024-03-01_13-45-10".
pub fn file_stamp() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Replaces characters that are unsafe in filenames and collapses
/// whitespace runs into underscores.
pub fn sanitize_filename(name: &str) -> String {
    let trimmed = name.trim();
    let safe = FORBIDDEN_CHARS.replace_all(trimmed, "-");
    WHITESPACE_RUN.replace_all(&safe, "_").into_owned()
}

/// Writes `value` as pretty JSON to `<dir>/<name>_<timestamp>.json`,
/// creating the directory if needed. Returns the written path.
pub fn save_json<T: Serialize>(dir: &str, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = Path::new(dir).join(format!("{}_{}.json", sanitize_filename(name), file_stamp()));
    let content = serde_json::to_string_pretty(value)?;
    fs::write(&path, content)?;
    info!("Saved results to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my-blog"), "my-blog");
        assert_eq!(sanitize_filename("tistory: 오늘의 리뷰"), "tistory-_오늘의_리뷰");
        assert_eq!(sanitize_filename("  a/b\\c  "), "a-b-c");
        assert_eq!(sanitize_filename("what?*<>"), "what----");
    }

    #[test]
    fn test_file_stamp_is_filename_safe() {
        let stamp = file_stamp();
        assert_eq!(stamp.len(), 19);
        assert!(!stamp.contains(' '));
        assert!(!stamp.contains(':'));
        assert_eq!(&stamp[10..11], "_");
    }

    #[test]
    fn test_save_json_round_trip() {
        let dir = std::env::temp_dir().join("kss-output-test");
        let dir_str = dir.to_string_lossy().into_owned();

        let path = save_json(&dir_str, "sample: run", &json!({ "ok": true })).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sample-_run_"));
        assert!(name.ends_with(".json"));

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["ok"], true);

        fs::remove_file(path).ok();
    }
}
