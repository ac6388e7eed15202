//! Relevance filtering and near-duplicate removal for aggregated records.
//!
//! The aggregator returns whatever the providers gave it. Before anything is
//! sent to the model the batch is cut down here: near-duplicate headlines are
//! dropped (first seen wins), off-topic items are discarded, and the rest is
//! ordered newest first and capped.

use crate::models::ArticleRecord;
use crate::utils::{collapse_whitespace, truncate_chars};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};

/// Most records handed to the synthesizer.
pub const MAX_BATCH: usize = 20;

/// Title prefix length used for the dedup key.
const KEY_PREFIX_CHARS: usize = 60;

static STOP_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(the|a|an|is|in|of|for|to|and|or|on|at|with)\b").expect("static stop-word regex")
});

/// Terms of which at least one must appear in title + summary.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "robot",
    "automation",
    "tech",
    "technology",
    "science",
    "software",
    "hardware",
    "cloud",
    "data",
    "algorithm",
    "neural",
    "gpt",
    "llm",
    "chip",
    "semiconductor",
    "quantum",
    "cybersecurity",
    "space",
    "biotech",
    "startup",
    "innovation",
    "research",
    "computing",
    "model",
    "openai",
    "google",
    "microsoft",
    "meta",
    "nvidia",
    "apple",
    "tesla",
];

/// Normalized title key: lowercase, first 60 characters, stop words
/// removed, whitespace collapsed.
pub fn dedup_key(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let prefix = truncate_chars(&lowered, KEY_PREFIX_CHARS);
    collapse_whitespace(&STOP_WORDS.replace_all(&prefix, ""))
}

/// Keep the first record for each [`dedup_key`], preserving order.
pub fn deduplicate(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    records
        .into_iter()
        .unique_by(|r| dedup_key(&r.title))
        .collect()
}

/// Whether the record mentions any [`DOMAIN_KEYWORDS`] term.
pub fn is_relevant(record: &ArticleRecord) -> bool {
    let text = format!("{} {}", record.title, record.summary).to_lowercase();
    DOMAIN_KEYWORDS.iter().any(|kw| text.contains(kw))
}

pub fn filter_relevant(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    records.into_iter().filter(is_relevant).collect()
}

/// Newest first; records without a usable timestamp sort last. Stable.
pub fn sort_newest_first(records: &mut [ArticleRecord]) {
    records.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
}

/// Dedupe, filter, order and cap a raw batch.
///
/// An empty result means the run has nothing to write about.
#[instrument(level = "info", skip_all, fields(raw = records.len()))]
pub fn select(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let unique = deduplicate(records);
    info!(count = unique.len(), "After deduplication");

    let mut relevant = filter_relevant(unique);
    info!(count = relevant.len(), "After relevance filter");

    sort_newest_first(&mut relevant);
    relevant.truncate(MAX_BATCH);
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Origin;

    fn record(title: &str, summary: &str, published: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            summary: summary.to_string(),
            url: format!("https://example.com/{}", crate::utils::slugify(title)),
            source: "Example".to_string(),
            published: published.to_string(),
            content: summary.to_string(),
            origin: Origin::NewsApi,
        }
    }

    #[test]
    fn test_dedup_key_strips_stop_words() {
        assert_eq!(
            dedup_key("The Rise of the Machines"),
            dedup_key("rise machines")
        );
        assert_eq!(dedup_key("  An  AI   for   Everyone "), "ai everyone");
    }

    #[test]
    fn test_dedup_key_only_uses_prefix() {
        let base = "x".repeat(60);
        assert_eq!(
            dedup_key(&format!("{base} first ending")),
            dedup_key(&format!("{base} another ending"))
        );
    }

    #[test]
    fn test_deduplicate_first_seen_wins() {
        let records = vec![
            record("OpenAI ships a new model", "first", ""),
            record("Nvidia earnings beat", "other", ""),
            record("openai ships new model", "second", ""),
            record("OPENAI SHIPS THE NEW MODEL", "third", ""),
        ];
        let unique = deduplicate(records);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].summary, "first");
        assert_eq!(unique[1].title, "Nvidia earnings beat");
    }

    #[test]
    fn test_relevance_is_case_insensitive_over_title_and_summary() {
        assert!(is_relevant(&record("Quarterly results", "NVIDIA beat estimates", "")));
        assert!(is_relevant(&record("QUANTUM leap", "", "")));
        assert!(!is_relevant(&record("Local bakery wins award", "Best bread in town", "")));
    }

    #[test]
    fn test_filter_excludes_every_off_topic_record() {
        let records = vec![
            record("Football final tonight", "Fans gather", ""),
            record("Robotics startup raises funds", "Series A", ""),
            record("Weather warning", "Heavy snow", ""),
        ];
        let kept = filter_relevant(records);
        assert_eq!(kept.len(), 1);
        assert!(kept.iter().all(is_relevant));
    }

    #[test]
    fn test_select_orders_newest_first_with_undated_last() {
        let records = vec![
            record("Chip shortage eases", "semiconductor", ""),
            record("Cloud outage", "cloud", "2025-05-06T08:00:00Z"),
            record("Quantum record", "quantum", "2025-05-06T12:00:00+00:00"),
        ];
        let selected = select(records);
        let titles: Vec<_> = selected.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Quantum record", "Cloud outage", "Chip shortage eases"]);
    }

    #[test]
    fn test_select_caps_batch() {
        let records = (0..30)
            .map(|i| record(&format!("Tech story number {i}"), "technology", ""))
            .collect();
        assert_eq!(select(records).len(), MAX_BATCH);
    }

    #[test]
    fn test_select_empty_and_all_filtered() {
        assert!(select(Vec::new()).is_empty());
        assert!(select(vec![record("Gardening tips", "Roses", "")]).is_empty());
    }
}
