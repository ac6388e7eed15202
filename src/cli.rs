//! Command-line interface definitions for the TechNews publisher.
//!
//! Secrets may be passed as flags but are normally taken from the
//! environment so they never land in shell history or the config file.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the TechNews publisher.
///
/// Without `--now` the process stays alive and fires once per day at
/// `schedule.run_time` (UTC).
///
/// # Examples
///
/// ```sh
/// # One run right now, using ./config.yaml if present
/// technews_publisher --now
///
/// # Daily scheduler with an explicit config
/// technews_publisher -c /etc/technews/config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file (defaults to ./config.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run the pipeline once immediately and exit instead of waiting for the daily slot
    #[arg(long)]
    pub now: bool,

    /// Directory for the published-slug ledger and the IndexNow key
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory for post backups and sitemap.xml
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// NewsAPI key
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true)]
    pub newsapi_key: Option<String>,

    /// Bearer key for the OpenAI-compatible generative-text API
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Base URL of the content backend
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Admin account used to obtain a bearer token from the backend
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Admin password for the backend
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Public base URL of the site (used for canonical URLs and the sitemap)
    #[arg(long, env = "SITE_BASE_URL")]
    pub site_base_url: Option<String>,
}
