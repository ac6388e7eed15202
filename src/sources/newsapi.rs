//! NewsAPI keyword search.
//!
//! One `GET /v2/everything` per configured topic, restricted to the recency
//! window and capped at `max_articles_per_topic` results.

use crate::config::NewsApiConfig;
use crate::error::SourceError;
use crate::models::{ArticleRecord, Origin};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
pub struct NewsApiResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
}

#[allow(non_snake_case)]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewsApiArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: NewsApiSource,
    pub publishedAt: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewsApiSource {
    pub name: Option<String>,
}

/// Normalize one NewsAPI result; `None` when it lacks a title or description.
pub fn normalize(article: NewsApiArticle) -> Option<ArticleRecord> {
    let title = article.title.filter(|t| !t.trim().is_empty())?;
    let summary = article.description.filter(|d| !d.trim().is_empty())?;
    let content = article
        .content
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| summary.clone());

    Some(ArticleRecord {
        title: title.trim().to_string(),
        summary,
        url: article.url.unwrap_or_default(),
        source: article.source.name.unwrap_or_default(),
        published: article.publishedAt.unwrap_or_default(),
        content,
        origin: Origin::NewsApi,
    })
}

/// Interpret a decoded response body.
pub fn records_from_response(body: NewsApiResponse) -> Result<Vec<ArticleRecord>, SourceError> {
    if body.status != "ok" {
        return Err(SourceError::Provider(
            body.message.unwrap_or_else(|| format!("status '{}'", body.status)),
        ));
    }
    Ok(body.articles.into_iter().filter_map(normalize).collect())
}

/// Search one topic.
#[instrument(level = "info", skip(client, cfg, since))]
pub async fn fetch_topic(
    client: &Client,
    cfg: &NewsApiConfig,
    topic: &str,
    since: DateTime<Utc>,
) -> Result<Vec<ArticleRecord>, SourceError> {
    let from = since.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let page_size = cfg.max_articles_per_topic.to_string();

    let resp = client
        .get(&cfg.endpoint)
        .query(&[
            ("q", topic),
            ("from", from.as_str()),
            ("sortBy", cfg.sort_by.as_str()),
            ("language", cfg.language.as_str()),
            ("pageSize", page_size.as_str()),
            ("apiKey", cfg.api_key.as_str()),
        ])
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;

    // NewsAPI explains 4xx in a JSON body with status "error"
    match serde_json::from_str::<NewsApiResponse>(&text) {
        Ok(body) => records_from_response(body),
        Err(e) => {
            debug!(error = %e, "NewsAPI body is not the expected JSON");
            Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&text, 200),
            })
        }
    }
}
