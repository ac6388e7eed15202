//! RSS 2.0 / Atom feed reader.
//!
//! Only the first `max_articles_per_feed` entries of a feed are looked at.
//! Dated entries older than the recency cutoff are skipped; undated ones are
//! kept with an empty timestamp. Summaries are reduced to plain text and
//! capped at [`MAX_SUMMARY_CHARS`].

use crate::config::FeedsConfig;
use crate::error::SourceError;
use crate::models::{ArticleRecord, Origin};
use crate::utils::{strip_markup, truncate_chars, truncate_for_log};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

pub const MAX_SUMMARY_CHARS: usize = 500;

/// Parse a feed document into records.
pub fn parse_feed(
    body: &[u8],
    feed_url: &str,
    max_entries: usize,
    cutoff: DateTime<Utc>,
) -> Result<Vec<ArticleRecord>, SourceError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| SourceError::Parse(e.to_string()))?;

    let source = feed
        .title
        .map(|t| strip_markup(&t.content))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| feed_url.to_string());

    let mut records = Vec::new();
    for entry in feed.entries.into_iter().take(max_entries) {
        let published = entry.published.or(entry.updated);
        if let Some(when) = published {
            if when < cutoff {
                debug!(%when, "Skipping entry outside recency window");
                continue;
            }
        }

        let title = entry
            .title
            .map(|t| strip_markup(&t.content))
            .unwrap_or_default();
        let raw_summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();
        let text = strip_markup(&raw_summary);

        if title.is_empty() || text.is_empty() {
            continue;
        }

        records.push(ArticleRecord {
            title,
            summary: truncate_chars(&text, MAX_SUMMARY_CHARS),
            url: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            source: source.clone(),
            published: published.map(|p| p.to_rfc3339()).unwrap_or_default(),
            content: text,
            origin: Origin::Rss,
        });
    }
    Ok(records)
}

/// Download and parse one feed.
#[instrument(level = "info", skip(client, cfg, cutoff))]
pub async fn fetch_feed(
    client: &Client,
    cfg: &FeedsConfig,
    feed_url: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<ArticleRecord>, SourceError> {
    let resp = client
        .get(feed_url)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status: status.as_u16(),
            body: truncate_for_log(&body, 200),
        });
    }

    let bytes = resp.bytes().await?;
    parse_feed(&bytes, feed_url, cfg.max_articles_per_feed, cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 5, 12, 0, 0).unwrap()
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Tech Feed</title>
    <link>https://tech.example</link>
    <item>
      <title>Fresh AI story</title>
      <link>https://tech.example/fresh</link>
      <pubDate>Tue, 06 May 2025 09:00:00 GMT</pubDate>
      <description><![CDATA[<p>An <em>AI</em> lab released a model.</p>]]></description>
    </item>
    <item>
      <title>Old story</title>
      <link>https://tech.example/old</link>
      <pubDate>Sun, 04 May 2025 09:00:00 GMT</pubDate>
      <description>Stale</description>
    </item>
    <item>
      <title>Undated story</title>
      <link>https://tech.example/undated</link>
      <description>No date given</description>
    </item>
    <item>
      <title>Empty summary</title>
      <link>https://tech.example/empty</link>
      <description><![CDATA[<img src="x.png"/>]]></description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_filters_and_normalizes() {
        let records = parse_feed(RSS.as_bytes(), "https://tech.example/rss", 10, cutoff()).unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Fresh AI story", "Undated story"]);

        let fresh = &records[0];
        assert_eq!(fresh.summary, "An AI lab released a model.");
        assert_eq!(fresh.source, "Tech Feed");
        assert_eq!(fresh.url, "https://tech.example/fresh");
        assert_eq!(fresh.origin, Origin::Rss);
        assert_eq!(
            fresh.published_at(),
            Some(cutoff() + Duration::hours(21))
        );
        assert_eq!(records[1].published, "");
    }

    #[test]
    fn test_parse_respects_entry_cap() {
        // only the first entry is examined
        let records = parse_feed(RSS.as_bytes(), "https://tech.example/rss", 1, cutoff()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_summary_is_capped() {
        let long = "robot ".repeat(200);
        let xml = format!(
            r#"<rss version="2.0"><channel><title>T</title><item><title>Long</title><link>https://x</link><description>{long}</description></item></channel></rss>"#
        );
        let records = parse_feed(xml.as_bytes(), "https://x/rss", 5, cutoff()).unwrap();
        assert_eq!(records[0].summary.chars().count(), MAX_SUMMARY_CHARS);
        assert!(records[0].content.len() > MAX_SUMMARY_CHARS);
    }

    #[test]
    fn test_parse_atom_uses_feed_url_when_untitled() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:feed</id>
  <title></title>
  <updated>2025-05-06T10:00:00Z</updated>
  <entry>
    <id>urn:1</id>
    <title>Quantum chip milestone</title>
    <link href="https://atom.example/q"/>
    <updated>2025-05-06T10:00:00Z</updated>
    <summary>Qubits galore</summary>
  </entry>
</feed>"#;
        let records = parse_feed(atom.as_bytes(), "https://atom.example/feed", 5, cutoff()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "https://atom.example/feed");
        assert_eq!(records[0].url, "https://atom.example/q");
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = parse_feed(b"not a feed", "https://x", 5, cutoff()).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
