//! Runtime configuration.
//!
//! Settings come from an optional YAML document (see [`load_config`]) whose
//! sections all fall back to the defaults below, then secrets and paths given
//! on the command line or in the environment are layered on top with
//! [`Config::apply_cli`].

use crate::cli::Cli;
use crate::error::ConfigError;
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Marker left in template configs for keys the operator has not filled in.
const PLACEHOLDER_MARKER: &str = "YOUR_";

/// Whether a secret has been filled in.
pub fn is_configured(key: &str) -> bool {
    !key.trim().is_empty() && !key.contains(PLACEHOLDER_MARKER)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub backend: BackendConfig,
    pub llm: LlmConfig,
    pub newsapi: NewsApiConfig,
    pub feeds: FeedsConfig,
    pub article: ArticleConfig,
    pub indexing: IndexingConfig,
    pub schedule: ScheduleConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://example.com".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Public URL of a post.
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/blog/{}", self.base(), slug)
    }

    pub fn sitemap_url(&self) -> String {
        format!("{}/sitemap.xml", self.base())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub login_endpoint: String,
    pub posts_endpoint: String,
    pub listing_page_size: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            admin_email: String::new(),
            admin_password: String::new(),
            login_endpoint: "/api/admin/login".to_string(),
            posts_endpoint: "/api/posts".to_string(),
            listing_page_size: 100,
        }
    }
}

impl BackendConfig {
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_endpoint)
    }

    pub fn posts_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.posts_endpoint)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub topics: Vec<String>,
    pub max_articles_per_topic: u32,
    pub language: String,
    pub sort_by: String,
    pub timeout_secs: u64,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://newsapi.org/v2/everything".to_string(),
            topics: [
                "artificial intelligence",
                "machine learning",
                "tech automation",
                "science technology",
                "robotics",
                "generative AI",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_articles_per_topic: 5,
            language: "en".to_string(),
            sort_by: "publishedAt".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub urls: Vec<String>,
    pub max_articles_per_feed: usize,
    pub timeout_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: [
                "https://feeds.feedburner.com/TechCrunch",
                "https://www.wired.com/feed/rss",
                "https://feeds.arstechnica.com/arstechnica/technology-lab",
                "https://rss.cnn.com/rss/cnn_tech.rss",
                "https://www.theverge.com/rss/index.xml",
                "https://feeds.feedburner.com/venturebeat/SZYF",
                "https://www.sciencedaily.com/rss/computers_math/artificial_intelligence.xml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_articles_per_feed: 5,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArticleConfig {
    pub include_sources: bool,
    pub tone: String,
    pub author: String,
    pub status: String,
    pub default_tags: Vec<String>,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            include_sources: true,
            tone: "professional yet accessible".to_string(),
            author: "TechNews Bot".to_string(),
            status: "published".to_string(),
            default_tags: ["AI", "Technology", "Automation", "Tech News"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub indexnow_endpoint: String,
    pub google_ping_endpoint: String,
    pub bing_ping_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            indexnow_endpoint: "https://api.indexnow.org/indexnow".to_string(),
            google_ping_endpoint: "https://www.google.com/ping".to_string(),
            bing_ping_endpoint: "https://www.bing.com/ping".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Daily trigger time, `HH:MM`, UTC.
    pub run_time: String,
    pub poll_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_time: "08:00".to_string(),
            poll_interval_secs: 50,
        }
    }
}

impl ScheduleConfig {
    pub fn run_at(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.run_time.trim(), "%H:%M").map_err(|e| {
            ConfigError::Invalid(format!(
                "schedule.run_time '{}' is not HH:MM ({e})",
                self.run_time
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Ledger and IndexNow key.
    pub data_dir: PathBuf,
    /// Post backups and the sitemap.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl PathsConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("published.json")
    }

    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join("indexnow_key.txt")
    }

    pub fn sitemap_path(&self) -> PathBuf {
        self.output_dir.join("sitemap.xml")
    }

    pub fn backup_path(&self, slug: &str) -> PathBuf {
        self.output_dir.join(format!("{slug}.json"))
    }
}

impl Config {
    /// Layer CLI flags and environment secrets over the file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.newsapi_key {
            self.newsapi.api_key = v.clone();
        }
        if let Some(v) = &cli.llm_api_key {
            self.llm.api_key = v.clone();
        }
        if let Some(v) = &cli.api_base_url {
            self.backend.base_url = v.clone();
        }
        if let Some(v) = &cli.admin_email {
            self.backend.admin_email = v.clone();
        }
        if let Some(v) = &cli.admin_password {
            self.backend.admin_password = v.clone();
        }
        if let Some(v) = &cli.site_base_url {
            self.site.base_url = v.clone();
        }
        if let Some(v) = &cli.data_dir {
            self.paths.data_dir = v.clone();
        }
        if let Some(v) = &cli.output_dir {
            self.paths.output_dir = v.clone();
        }
    }

    /// Checks that do not need the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.run_at()?;
        url::Url::parse(&self.site.base_url).map_err(|e| {
            ConfigError::Invalid(format!("site.base_url '{}': {e}", self.site.base_url))
        })?;
        if self.backend.listing_page_size == 0 {
            return Err(ConfigError::Invalid(
                "backend.listing_page_size must be positive".to_string(),
            ));
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "schedule.poll_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a YAML config document.
///
/// `None` means "use `config.yaml` if it exists, otherwise built-in
/// defaults". An explicit path that cannot be read is an error.
#[instrument(level = "info")]
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from("config.yaml"), false),
    };

    if !explicit && !path.exists() {
        info!("No config.yaml found; using built-in defaults");
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}
