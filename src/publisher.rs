//! Post submission.
//!
//! Authenticates once per run (the token lives in [`RunContext`]), submits
//! the post without its metadata block, and on acceptance writes the local
//! backup and records the slug in the ledger.

use crate::backend::ContentBackend;
use crate::config::{PathsConfig, SiteConfig};
use crate::error::BackendError;
use crate::ledger::Ledger;
use crate::models::GeneratedPost;
use crate::outputs::json::write_backup;
use tracing::{error, info, instrument, warn};

/// State that lives for exactly one pipeline run.
#[derive(Debug, Default)]
pub struct RunContext {
    token: Option<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The cached bearer token, logging in on first use.
    pub async fn token<B: ContentBackend>(&mut self, backend: &B) -> Result<&str, BackendError> {
        if self.token.is_none() {
            let token = backend.login().await?;
            info!("Authenticated with content backend");
            self.token = Some(token);
        }
        Ok(self.token.as_deref().unwrap_or_default())
    }
}

/// Submit `post`. Returns its canonical URL on acceptance.
#[instrument(level = "info", skip_all, fields(slug = %post.slug()))]
pub async fn publish<B: ContentBackend>(
    backend: &B,
    ctx: &mut RunContext,
    post: &GeneratedPost,
    site: &SiteConfig,
    paths: &PathsConfig,
    ledger: &mut Ledger,
) -> Result<String, BackendError> {
    let token = ctx.token(backend).await.inspect_err(|e| {
        error!(error = %e, "Authentication failed; not submitting");
    })?;

    match backend.create_post(token, &post.post).await {
        Ok(id) => {
            info!(id = id.as_deref().unwrap_or("?"), "Post created");
        }
        Err(e) => {
            match &e {
                BackendError::AuthRejected => error!("Backend rejected the bearer token"),
                BackendError::Conflict(msg) => warn!(%msg, "A post with this slug already exists"),
                BackendError::Validation(msg) => error!(%msg, "Backend rejected the post as invalid"),
                other => error!(error = %other, "Post submission failed"),
            }
            return Err(e);
        }
    }

    if let Err(e) = write_backup(post, &paths.backup_path(post.slug())).await {
        warn!(error = %e, "Could not write local backup");
    }
    if let Err(e) = ledger.record(post.slug()).await {
        error!(
            slug = post.slug(),
            error = %e,
            "Post is live but the published-slug ledger was not saved; the next run may resubmit it"
        );
    }

    let url = site.post_url(post.slug());
    info!(%url, "Published");
    Ok(url)
}
