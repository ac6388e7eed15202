//! Turns the day's records into one publishable post.
//!
//! The model is asked once for a JSON object (title, excerpt, keywords, tags,
//! reading time, HTML body, sources). Anything short of a parseable object
//! with a non-empty title, content and excerpt yields no post; there is no
//! retry and no partial acceptance.

use crate::api::AskAsync;
use crate::config::{ArticleConfig, SiteConfig};
use crate::error::SynthError;
use crate::models::{ArticleRecord, GeneratedPost, ModelArticle, PostMeta, PostPayload, SourceLink};
use crate::utils::{looks_truncated, slugify, truncate_chars, truncate_for_log};
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, error, info, instrument, warn};

/// Records embedded in the prompt.
pub const PROMPT_RECORDS: usize = 15;
/// Per-record summary length in the prompt.
pub const PROMPT_SUMMARY_CHARS: usize = 300;
/// Fetched records whose URLs may be added to the Sources section.
pub const EXTRA_SOURCE_RECORDS: usize = 8;
pub const MAX_EXCERPT_CHARS: usize = 300;

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?\s*").expect("static fence regex"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("static fence regex"));

/// Build the user prompt for `records`.
pub fn build_prompt(records: &[ArticleRecord], tone: &str, today: NaiveDate) -> String {
    let mut news_block = String::new();
    for (i, r) in records.iter().take(PROMPT_RECORDS).enumerate() {
        let _ = write!(
            news_block,
            "\nArticle {}:\n  Title: {}\n  Source: {}\n  Summary: {}\n  URL: {}\n",
            i + 1,
            r.title,
            r.source,
            truncate_chars(&r.summary, PROMPT_SUMMARY_CHARS),
            r.url
        );
    }

    format!(
        r#"You are a professional tech journalist writing for a popular technology blog.

Today is {date}. I have gathered the following latest news articles from tech/AI/science sources:
{news_block}
Based on these real news items, write a comprehensive, engaging news roundup article in a {tone} tone.

Return your response as a single valid JSON object. No markdown, no code fences, no explanation: ONLY raw JSON.

Use this exact structure:
{{
  "title": "Catchy SEO-friendly title (max 70 chars)",
  "excerpt": "2-sentence summary of the article (max 200 chars)",
  "meta_keywords": "8-12 comma-separated keywords",
  "tags": ["AI", "Technology", "Automation"],
  "reading_time": 5,
  "content": "<h2>Introduction</h2><p>...</p>",
  "sources": [
    {{"name": "Source Name", "url": "https://..."}}
  ]
}}

REQUIREMENTS for the content field:
- 800-1200 words of ORIGINAL content (not copied from the sources)
- Use only these HTML tags: <h2>, <h3>, <p>, <ul>, <li>, <strong>, <em>
- Start with a strong intro paragraph
- Cover 3-5 major stories from the news items above
- Include a "Key Takeaways" section near the end
- End with a brief forward-looking conclusion
- NO <html>, <head>, <body> or <script> wrapper tags
- Synthesize and add your own analysis; do not plagiarize

RETURN ONLY THE RAW JSON. No text before or after it."#,
        date = today.format("%B %d, %Y"),
    )
}

/// Remove a Markdown code fence the model may wrap its JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_lead = LEADING_FENCE.replace(trimmed, "");
    TRAILING_FENCE.replace(&without_lead, "").trim().to_string()
}

fn non_empty(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Parse and validate the model's answer.
pub fn parse_model_response(raw: &str) -> Result<ModelArticle, SynthError> {
    let cleaned = strip_code_fences(raw);
    let article: ModelArticle = serde_json::from_str(&cleaned).map_err(|e| {
        if looks_truncated(&e) {
            warn!(error = %e, "Model response looks truncated (hit token limit?)");
        }
        debug!(response_preview = %truncate_for_log(&cleaned, 500), "Unparseable model response");
        SynthError::Parse(e)
    })?;

    if !non_empty(&article.title) {
        return Err(SynthError::MissingField("title"));
    }
    if !non_empty(&article.content) {
        return Err(SynthError::MissingField("content"));
    }
    if !non_empty(&article.excerpt) {
        return Err(SynthError::MissingField("excerpt"));
    }
    let title = article.title.as_deref().unwrap_or_default();
    if slugify(title).is_empty() {
        return Err(SynthError::EmptySlug(title.to_string()));
    }
    Ok(article)
}

/// Model-cited sources followed by fetched URLs not already cited, deduped
/// by URL. Entries without a URL are dropped.
pub fn collect_sources(model_sources: &[SourceLink], records: &[ArticleRecord]) -> Vec<SourceLink> {
    let fetched = records
        .iter()
        .take(EXTRA_SOURCE_RECORDS)
        .map(|r| SourceLink {
            name: r.source.clone(),
            url: r.url.clone(),
        });

    let mut seen = HashSet::new();
    model_sources
        .iter()
        .cloned()
        .chain(fetched)
        .filter(|s| !s.url.trim().is_empty())
        .filter(|s| seen.insert(s.url.clone()))
        .collect()
}

/// HTML block appended to the post body.
pub fn render_sources(sources: &[SourceLink]) -> String {
    let items = sources
        .iter()
        .map(|s| {
            let name = if s.name.trim().is_empty() { &s.url } else { &s.name };
            format!(
                r#"<li><a href="{}" target="_blank" rel="noopener noreferrer">{}</a></li>"#,
                html_escape::encode_double_quoted_attribute(&s.url),
                html_escape::encode_text(name)
            )
        })
        .join("\n");
    format!("\n<hr/>\n<h3>Sources &amp; References</h3>\n<ul>\n{items}\n</ul>")
}

/// Default tags first, then the model's, without duplicates.
pub fn merge_tags(defaults: &[String], model_tags: Option<&[String]>) -> Vec<String> {
    defaults
        .iter()
        .chain(model_tags.unwrap_or(defaults))
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .unique()
        .map(str::to_string)
        .collect()
}

/// Assemble the final post from a validated model answer.
pub fn assemble_post(
    model: ModelArticle,
    records: &[ArticleRecord],
    article_cfg: &ArticleConfig,
    site: &SiteConfig,
    today: NaiveDate,
) -> GeneratedPost {
    let reading_time = model.reading_time_minutes();
    let title = model.title.unwrap_or_default().trim().to_string();
    let mut content = model.content.unwrap_or_default();

    if article_cfg.include_sources {
        let sources = collect_sources(&model.sources, records);
        if !sources.is_empty() {
            content.push_str(&render_sources(&sources));
        }
    }

    let slug = slugify(&title);
    let tags = merge_tags(&article_cfg.default_tags, model.tags.as_deref());

    GeneratedPost {
        post: PostPayload {
            title,
            content,
            excerpt: truncate_chars(model.excerpt.as_deref().unwrap_or_default(), MAX_EXCERPT_CHARS),
            featured_image: String::new(),
            status: article_cfg.status.clone(),
            author: article_cfg.author.clone(),
            tags,
            slug: slug.clone(),
        },
        meta: PostMeta {
            date: today.format("%Y-%m-%d").to_string(),
            reading_time,
            meta_keywords: model.meta_keywords.unwrap_or_default(),
            canonical_url: site.post_url(&slug),
        },
    }
}

/// Ask the model for a post covering `records`.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn synthesize<A>(
    ask: &A,
    records: &[ArticleRecord],
    article_cfg: &ArticleConfig,
    site: &SiteConfig,
    today: NaiveDate,
) -> Result<GeneratedPost, SynthError>
where
    A: AskAsync<Response = String>,
{
    let prompt = build_prompt(records, &article_cfg.tone, today);
    let raw = ask.ask(&prompt).await.inspect_err(|e| {
        error!(error = %e, "Generative-text call failed");
    })?;

    let model = parse_model_response(&raw).inspect_err(|e| {
        error!(error = %e, "Model returned an unusable article");
    })?;

    let post = assemble_post(model, records, article_cfg, site, today);
    info!(title = %post.post.title, slug = %post.slug(), tags = ?post.post.tags, "Article ready");
    Ok(post)
}
