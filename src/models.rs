//! Data models shared by the pipeline stages.
//!
//! - [`ArticleRecord`]: one normalized news item from any provider
//! - [`ModelArticle`]: the JSON object the generative-text model returns
//! - [`GeneratedPost`]: the publishable post plus its local metadata block
//! - [`SitemapEntry`] and the backend listing shapes used to rebuild the sitemap
//!
//! Backend-facing structs use camelCase on the wire to match the content
//! backend's post schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which provider an [`ArticleRecord`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    NewsApi,
    Rss,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::NewsApi => f.write_str("newsapi"),
            Origin::Rss => f.write_str("rss"),
        }
    }
}

/// A news item normalized from a provider response.
///
/// Records are created once by the aggregator and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub summary: String,
    pub url: String,
    /// Publication or feed name.
    pub source: String,
    /// ISO-8601 timestamp, or empty when the provider gave none.
    pub published: String,
    pub content: String,
    pub origin: Origin,
}

impl ArticleRecord {
    /// Parsed publish time; `None` for empty or unparseable timestamps.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.published.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A `{name, url}` reference cited by the generated post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLink {
    #[serde(deserialize_with = "text_or_empty")]
    pub name: String,
    #[serde(deserialize_with = "text_or_empty")]
    pub url: String,
}

/// A string, or empty for `null` and any other shape.
fn text_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn string_items(items: Vec<Value>) -> impl Iterator<Item = String> {
    items.into_iter().filter_map(|v| match v {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Keywords as one comma-separated string; a list is joined.
fn keywords<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Array(items) => Some(string_items(items).collect::<Vec<_>>().join(", ")),
        _ => None,
    })
}

/// Tags as a list; a comma-separated string is split.
fn tag_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => Some(string_items(items).collect()),
        Value::String(s) => Some(s.split(',').map(|t| t.trim().to_string()).collect()),
        _ => None,
    })
}

/// Source objects; anything that is not a list, or not an object inside it,
/// is dropped.
fn source_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<SourceLink>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// The JSON object requested from the model.
///
/// Every field is optional on the wire; required ones are checked by the
/// synthesizer so a missing field is reported by name rather than as a
/// generic decode error. Optional fields of the wrong shape fall back to
/// their defaults instead of failing the decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelArticle {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    #[serde(deserialize_with = "keywords")]
    pub meta_keywords: Option<String>,
    #[serde(deserialize_with = "tag_list")]
    pub tags: Option<Vec<String>>,
    pub reading_time: Option<Value>,
    pub content: Option<String>,
    #[serde(deserialize_with = "source_list")]
    pub sources: Vec<SourceLink>,
}

impl ModelArticle {
    /// Minutes of reading time; models return it as a number or a string.
    pub fn reading_time_minutes(&self) -> u32 {
        const DEFAULT_MINUTES: u32 = 5;
        match &self.reading_time {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.round() as u64))
                .and_then(|m| u32::try_from(m).ok())
                .unwrap_or(DEFAULT_MINUTES),
            Some(Value::String(s)) => s
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_MINUTES),
            _ => DEFAULT_MINUTES,
        }
    }
}

/// The post body accepted by the backend's creation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image: String,
    pub status: String,
    pub author: String,
    pub tags: Vec<String>,
}

/// Local metadata kept alongside a post but never sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMeta {
    /// Generation date, `YYYY-MM-DD`.
    pub date: String,
    pub reading_time: u32,
    pub meta_keywords: String,
    pub canonical_url: String,
}

/// A post ready for submission.
///
/// Serializes as the payload fields with the metadata under `_meta`, which
/// is the shape of the local backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPost {
    #[serde(flatten)]
    pub post: PostPayload,
    #[serde(rename = "_meta")]
    pub meta: PostMeta,
}

impl GeneratedPost {
    pub fn slug(&self) -> &str {
        &self.post.slug
    }
}

/// One `<url>` of the sitemap besides the home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub slug: String,
    /// `YYYY-MM-DD`.
    pub lastmod: String,
}

/// A page of the backend's public post listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostListing {
    pub posts: Vec<ListedPost>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedPost {
    pub slug: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { total_pages: 1 }
    }
}
