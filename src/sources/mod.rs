//! News providers feeding the pipeline.
//!
//! Each provider follows the same pattern: one bounded request per topic or
//! feed, normalization into [`ArticleRecord`], and log-and-continue on any
//! failure so a single dead source never empties the batch.
//!
//! | Provider | Module | Auth | Origin tag |
//! |----------|--------|------|------------|
//! | NewsAPI keyword search | [`newsapi`] | API key | `newsapi` |
//! | RSS / Atom feeds | [`rss`] | none | `rss` |
//!
//! Both only consider items from the last [`RECENCY_WINDOW_HOURS`] hours.

use crate::config::{FeedsConfig, NewsApiConfig, is_configured};
use crate::models::ArticleRecord;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tracing::{error, info, instrument, warn};

pub mod newsapi;
pub mod rss;

pub const RECENCY_WINDOW_HOURS: i64 = 24;

/// Oldest publish time still considered recent.
pub fn recency_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(RECENCY_WINDOW_HOURS)
}

/// Something that can produce the raw article batch for a run.
pub trait ArticleSource {
    /// Gather records from every provider. Never fails; an empty batch is a
    /// valid (if disappointing) answer.
    async fn collect(&self) -> Vec<ArticleRecord>;
}

/// Queries NewsAPI for every topic and every configured feed, in order.
#[derive(Debug)]
pub struct Aggregator<'a> {
    pub client: &'a Client,
    pub newsapi: &'a NewsApiConfig,
    pub feeds: &'a FeedsConfig,
}

impl Aggregator<'_> {
    #[instrument(level = "info", skip_all)]
    async fn collect_newsapi(&self, since: DateTime<Utc>) -> Vec<ArticleRecord> {
        if !is_configured(&self.newsapi.api_key) {
            warn!("NewsAPI key not configured; skipping NewsAPI");
            return Vec::new();
        }

        let mut records = Vec::new();
        for topic in &self.newsapi.topics {
            match newsapi::fetch_topic(self.client, self.newsapi, topic, since).await {
                Ok(batch) => {
                    info!(%topic, count = batch.len(), "NewsAPI topic fetched");
                    records.extend(batch);
                }
                Err(e) => error!(%topic, error = %e, "NewsAPI fetch failed; continuing"),
            }
        }
        records
    }

    #[instrument(level = "info", skip_all)]
    async fn collect_feeds(&self, cutoff: DateTime<Utc>) -> Vec<ArticleRecord> {
        let mut records = Vec::new();
        for feed_url in &self.feeds.urls {
            match rss::fetch_feed(self.client, self.feeds, feed_url, cutoff).await {
                Ok(batch) => {
                    let name = batch.first().map(|r| r.source.as_str()).unwrap_or(feed_url.as_str());
                    info!(feed = %crate::utils::truncate_chars(name, 40), count = batch.len(), "Feed fetched");
                    records.extend(batch);
                }
                Err(e) => error!(feed = %feed_url, error = %e, "Feed fetch failed; continuing"),
            }
        }
        records
    }
}

impl ArticleSource for Aggregator<'_> {
    #[instrument(level = "info", skip_all)]
    async fn collect(&self) -> Vec<ArticleRecord> {
        let cutoff = recency_cutoff(Utc::now());

        info!("Fetching from NewsAPI");
        let mut records = self.collect_newsapi(cutoff).await;

        info!("Fetching from feeds");
        records.extend(self.collect_feeds(cutoff).await);

        info!(count = records.len(), "Total raw articles");
        records
    }
}
