//! One end-to-end run: aggregate, filter, synthesize, publish, then the
//! best-effort sitemap and indexing stages.
//!
//! Load-bearing stages end the run with an [`AbortReason`] as soon as they
//! come up empty. Sitemap and indexing failures are only logged and never
//! change the outcome.

use crate::api::AskAsync;
use crate::backend::ContentBackend;
use crate::config::Config;
use crate::error::StoreError;
use crate::filter;
use crate::indexer::IndexNotify;
use crate::ledger::Ledger;
use crate::publisher::{RunContext, publish};
use crate::sitemap;
use crate::sources::ArticleSource;
use crate::synthesizer::synthesize;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{error, info, instrument, warn};

/// Why a run stopped before publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    NoArticles,
    SynthesisFailed,
    AlreadyPublished(String),
    PublishFailed,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoArticles => f.write_str("no articles"),
            AbortReason::SynthesisFailed => f.write_str("article generation failed"),
            AbortReason::AlreadyPublished(slug) => write!(f, "slug '{slug}' already published"),
            AbortReason::PublishFailed => f.write_str("publish failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published {
        url: String,
        slug: String,
        sitemap_written: bool,
        indexed: bool,
    },
    Aborted(AbortReason),
}

/// The external collaborators of a run.
pub struct Stages<'a, S, A, B, N> {
    pub source: &'a S,
    pub model: &'a A,
    pub backend: &'a B,
    pub notifier: &'a N,
}

/// Execute the pipeline once.
///
/// Only an unreadable ledger is an error; every other failure is either an
/// abort or logged and ignored.
#[instrument(level = "info", skip_all, fields(started = %now.to_rfc3339()))]
pub async fn run_once<S, A, B, N>(
    stages: &Stages<'_, S, A, B, N>,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<RunOutcome, StoreError>
where
    S: ArticleSource,
    A: AskAsync<Response = String>,
    B: ContentBackend,
    N: IndexNotify,
{
    let today = now.date_naive();
    let today_str = today.format("%Y-%m-%d").to_string();
    let mut ledger = Ledger::load(config.paths.ledger_path()).await?;
    info!(already_published = ledger.len(), "Run starting");

    // 1. aggregate
    let raw = stages.source.collect().await;
    let records = filter::select(raw);
    if records.is_empty() {
        error!("No relevant articles found; aborting run");
        return Ok(RunOutcome::Aborted(AbortReason::NoArticles));
    }
    info!(count = records.len(), "Articles selected for synthesis");

    // 2. synthesize
    let post = match synthesize(stages.model, &records, &config.article, &config.site, today).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "Article generation failed; aborting run");
            return Ok(RunOutcome::Aborted(AbortReason::SynthesisFailed));
        }
    };
    let slug = post.slug().to_string();

    // 3. same-day duplicate guard
    if ledger.contains(&slug) {
        warn!(%slug, "Slug already published; skipping");
        return Ok(RunOutcome::Aborted(AbortReason::AlreadyPublished(slug)));
    }

    // 4. publish
    let mut ctx = RunContext::new();
    let url = match publish(stages.backend, &mut ctx, &post, &config.site, &config.paths, &mut ledger).await {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Publishing failed; aborting run");
            return Ok(RunOutcome::Aborted(AbortReason::PublishFailed));
        }
    };

    // 5. sitemap (best effort)
    let sitemap_written = match sitemap::regenerate(
        stages.backend,
        &config.site,
        &config.paths,
        Some(slug.as_str()),
        &today_str,
    )
    .await
    {
        Ok(count) => {
            info!(posts = count, path = %config.paths.sitemap_path().display(), "Sitemap regenerated");
            true
        }
        Err(e) => {
            warn!(error = %e, "Sitemap regeneration failed");
            false
        }
    };

    // 6. indexing (best effort)
    let indexed = stages.notifier.notify(&url).await.any_succeeded();
    if !indexed {
        warn!("No search engine accepted the notification");
    }

    info!(%url, %slug, sitemap_written, indexed, "Run complete");
    Ok(RunOutcome::Published {
        url,
        slug,
        sitemap_written,
        indexed,
    })
}
