//! # TechNews Publisher
//!
//! A daily content pipeline that gathers the last day's technology news,
//! has an LLM write one original roundup post from it, publishes that post to
//! a blog backend, and tells search engines about it.
//!
//! ## Usage
//!
//! ```sh
//! # run the pipeline once, now
//! technews_publisher --now
//!
//! # stay resident and run every day at schedule.run_time (UTC)
//! technews_publisher -c config.yaml
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Aggregation**: NewsAPI topic searches and RSS/Atom feeds, last 24 hours
//! 2. **Selection**: near-duplicate removal, relevance filter, newest 20
//! 3. **Synthesis**: one chat completion returning the post as JSON
//! 4. **Publishing**: login, create, local backup, published-slug ledger
//! 5. **Sitemap**: rebuilt from the backend's post listing
//! 6. **Indexing**: IndexNow submission plus Google and Bing sitemap pings
//!
//! Steps 1 to 4 abort the run when they come up empty; 5 and 6 are best effort.

use chrono::Utc;
use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod backend;
mod cli;
mod config;
mod error;
mod filter;
mod indexer;
mod ledger;
mod models;
mod outputs;
mod pipeline;
mod publisher;
mod scheduler;
mod sitemap;
mod sources;
mod synthesizer;
#[cfg(test)]
mod test_support;
mod utils;

use api::ChatClient;
use backend::HttpBackend;
use cli::Cli;
use config::{Config, is_configured, load_config};
use indexer::IndexNotifier;
use pipeline::{RunOutcome, Stages, run_once};
use sources::Aggregator;
use utils::ensure_writable_dir;

/// Build the production stages and run the pipeline once.
#[instrument(level = "info", skip_all)]
async fn execute(client: &Client, config: &Config) {
    let started = Utc::now();
    info!(started = %started.to_rfc3339(), "Daily tech news run");

    let source = Aggregator {
        client,
        newsapi: &config.newsapi,
        feeds: &config.feeds,
    };
    let model = ChatClient {
        client,
        config: &config.llm,
    };
    let backend = HttpBackend {
        client,
        config: &config.backend,
    };
    let notifier = IndexNotifier {
        client,
        config: &config.indexing,
        site: &config.site,
        key_path: config.paths.key_path(),
    };
    let stages = Stages {
        source: &source,
        model: &model,
        backend: &backend,
        notifier: &notifier,
    };

    match run_once(&stages, config, started).await {
        Ok(RunOutcome::Published {
            url,
            sitemap_written,
            indexed,
            ..
        }) => info!(
            %url,
            sitemap_written,
            indexed,
            elapsed_secs = (Utc::now() - started).num_seconds(),
            "Published"
        ),
        Ok(RunOutcome::Aborted(reason)) => warn!(%reason, "Run aborted"),
        Err(e) => error!(error = %e, "Run failed"),
    }
}

/// Warn once at start-up about secrets that will make a stage skip or fail.
fn warn_unconfigured(config: &Config) {
    if !is_configured(&config.newsapi.api_key) {
        warn!("NEWSAPI_KEY not configured; only feeds will be used");
    }
    if !is_configured(&config.llm.api_key) {
        warn!("LLM_API_KEY not configured; article generation will fail");
    }
    if !is_configured(&config.backend.admin_email) || !is_configured(&config.backend.admin_password) {
        warn!("ADMIN_EMAIL / ADMIN_PASSWORD not configured; publishing will fail");
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "technews_publisher starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, now = args.now, "Parsed CLI arguments");

    // ---- Load config ----
    let mut config = load_config(args.config.as_deref())?;
    config.apply_cli(&args);
    config.validate()?;
    let run_at = config.schedule.run_at()?;
    info!(
        site = %config.site.base(),
        backend = %config.backend.base_url,
        model = %config.llm.model,
        "Configuration ready"
    );
    warn_unconfigured(&config);

    // Early check: state and output dirs are writable
    for dir in [&config.paths.data_dir, &config.paths.output_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    if args.now {
        execute(&client, &config).await;
    } else {
        let (client, config) = (&client, &config);
        scheduler::run_daily(
            run_at,
            Duration::from_secs(config.schedule.poll_interval_secs),
            tokio::signal::ctrl_c(),
            move || execute(client, config),
        )
        .await;
    }

    info!("technews_publisher exiting");
    Ok(())
}
