//! Utility functions for string cleanup, slugs and file system checks.
//!
//! - Slug generation for canonical post paths
//! - Char-safe truncation for logging and field caps
//! - Markup stripping for feed summaries
//! - JSON error detection for handling truncated model output
//! - Output/state directory validation

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Longest slug the backend accepts.
pub const MAX_SLUG_CHARS: usize = 80;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("static slug regex"));
static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]+").expect("static separator regex"));
static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static whitespace regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUNS.replace_all(s, " ").trim().to_string()
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A completion cut off by the token limit fails with an EOF error; this is
/// logged separately from other malformed output.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a title to a URL-safe slug.
///
/// Lowercases, drops every character that is not a word character,
/// whitespace or hyphen, collapses whitespace/underscore/hyphen runs into a
/// single hyphen, trims hyphens from both ends and caps the result at
/// [`MAX_SLUG_CHARS`] characters. Running it on its own output is a no-op.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  AI_Weekly -- Roundup "), "ai-weekly-roundup");
/// ```
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let kept = NON_SLUG_CHARS.replace_all(&lowered, "");
    let hyphenated = SLUG_SEPARATORS.replace_all(&kept, "-");
    let capped = truncate_chars(hyphenated.trim_matches('-'), MAX_SLUG_CHARS);
    capped.trim_end_matches('-').to_string()
}

/// Plain text of an HTML fragment, with entities decoded and whitespace
/// collapsed.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        // must not split a UTF-8 sequence
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with("ééé…"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("X"), "x");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  AI_Weekly -- Roundup "), "ai-weekly-roundup");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("Special@#$Characters"), "specialcharacters");
        assert_eq!(slugify("--Leading and trailing--"), "leading-and-trailing");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        let long = "word ".repeat(40);
        for title in [
            "OpenAI's GPT-5: What It Means for Developers (2025)",
            "Nvidia & TSMC — chips, chips, chips",
            "Ünïcödé Résumé of Robotics",
            long.as_str(),
        ] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once, "not idempotent for {title:?}");
        }
    }

    #[test]
    fn test_slugify_caps_length_without_dangling_hyphen() {
        let title = format!("{} tail", "a".repeat(79));
        let slug = slugify(&title);
        assert_eq!(slug, "a".repeat(79));

        let long = "quantum computing breakthrough ".repeat(10);
        let slug = slugify(&long);
        assert!(slug.chars().count() <= MAX_SLUG_CHARS);
        assert!(!slug.ends_with('-'));
        assert!(!slug.chars().any(|c| c.is_whitespace()));
        assert!(slug.chars().all(|c| c == '-' || c.is_alphanumeric()));
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("<p>Robots <b>are</b> coming &amp; going</p>\n<img src=\"x.png\">"),
            "Robots are coming & going"
        );
        assert_eq!(strip_markup("plain text"), "plain text");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let err = serde_json::from_str::<serde_json::Value>(json_eof).unwrap_err();
        assert!(looks_truncated(&err));

        let json_bad = r#"{"field": nope}"#;
        let err = serde_json::from_str::<serde_json::Value>(json_bad).unwrap_err();
        assert!(!looks_truncated(&err));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
