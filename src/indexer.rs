//! Search-engine notification after a publish.
//!
//! Three independent calls, each with its own timeout:
//!
//! 1. IndexNow `POST` with `{host, key, keyLocation, urlList}`; the key must be
//!    served by the site at `{base}/{key}.txt` for engines to accept it
//! 2. Google sitemap ping `GET ?sitemap=...`
//! 3. Bing sitemap ping `GET ?sitemap=...`
//!
//! A failure in one never prevents the others. The combined result only
//! feeds a log line.

use crate::config::{IndexingConfig, SiteConfig};
use crate::error::{IndexError, StoreError};
use crate::utils::truncate_for_log;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{error, info, instrument, warn};

/// Bytes of randomness in a generated key (hex-encoded to twice as many chars).
const KEY_BYTES: usize = 20;

/// Per-method outcome of one notification round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub indexnow: bool,
    pub google: bool,
    pub bing: bool,
}

impl IndexReport {
    pub fn any_succeeded(&self) -> bool {
        self.indexnow || self.google || self.bing
    }
}

/// Something that can tell search engines about a new URL.
pub trait IndexNotify {
    async fn notify(&self, url: &str) -> IndexReport;
}

fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().fold(String::with_capacity(KEY_BYTES * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Read the persisted IndexNow key, creating it on first use.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn get_or_create_key(path: &Path, site: &SiteConfig) -> Result<String, StoreError> {
    match fs::read_to_string(path).await {
        Ok(raw) if !raw.trim().is_empty() => return Ok(raw.trim().to_string()),
        Ok(_) => warn!("IndexNow key file is empty; generating a new key"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::io(path, e)),
    }

    let key = generate_key();
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))?;
    }
    fs::write(path, &key)
        .await
        .map_err(|e| StoreError::io(path, e))?;

    info!(
        file_name = %format!("{key}.txt"),
        file_content = %key,
        public_url = %format!("{}/{key}.txt", site.base()),
        "Generated IndexNow key; host a file with this name and content at the site root"
    );
    Ok(key)
}

/// Host component of the site URL.
fn site_host(site: &SiteConfig) -> String {
    url::Url::parse(site.base())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| {
            let base = site.base();
            base.split_once("://").map_or(base, |(_, rest)| rest).to_string()
        })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexNowRequest<'a> {
    host: String,
    key: &'a str,
    key_location: String,
    url_list: Vec<&'a str>,
}

/// Submit `urls` to IndexNow.
#[instrument(level = "info", skip_all, fields(urls = urls.len()))]
pub async fn submit_indexnow(
    client: &Client,
    cfg: &IndexingConfig,
    site: &SiteConfig,
    key: &str,
    urls: &[&str],
) -> Result<(), IndexError> {
    let key_location = format!("{}/{key}.txt", site.base());
    let body = IndexNowRequest {
        host: site_host(site),
        key,
        key_location: key_location.clone(),
        url_list: urls.to_vec(),
    };

    let resp = client
        .post(&cfg.indexnow_endpoint)
        .json(&body)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .send()
        .await?;

    match resp.status() {
        StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
        StatusCode::FORBIDDEN => Err(IndexError::KeyNotHosted { key_location }),
        StatusCode::UNPROCESSABLE_ENTITY => Err(IndexError::HostMismatch),
        status => {
            let body = resp.text().await.unwrap_or_default();
            Err(IndexError::Rejected {
                status: status.as_u16(),
                body: truncate_for_log(&body, 200),
            })
        }
    }
}

/// Ask a crawler to re-fetch the sitemap.
#[instrument(level = "info", skip(client, timeout))]
pub async fn ping_sitemap(
    client: &Client,
    endpoint: &str,
    sitemap_url: &str,
    timeout: Duration,
) -> Result<(), IndexError> {
    let resp = client
        .get(endpoint)
        .query(&[("sitemap", sitemap_url)])
        .timeout(timeout)
        .send()
        .await?;

    let status = resp.status();
    if status == StatusCode::OK {
        Ok(())
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(IndexError::Rejected {
            status: status.as_u16(),
            body: truncate_for_log(&body, 200),
        })
    }
}

fn mark(ok: bool) -> &'static str {
    if ok { "ok" } else { "failed" }
}

/// The production notifier.
#[derive(Debug)]
pub struct IndexNotifier<'a> {
    pub client: &'a Client,
    pub config: &'a IndexingConfig,
    pub site: &'a SiteConfig,
    pub key_path: PathBuf,
}

impl IndexNotifier<'_> {
    async fn indexnow(&self, url: &str) -> bool {
        let result = match get_or_create_key(&self.key_path, self.site).await {
            Ok(key) => submit_indexnow(self.client, self.config, self.site, &key, &[url]).await,
            Err(e) => Err(IndexError::Key(e)),
        };
        match result {
            Ok(()) => {
                info!("IndexNow accepted the URL");
                true
            }
            Err(IndexError::KeyNotHosted { key_location }) => {
                warn!(
                    %key_location,
                    "IndexNow rejected the key (HTTP 403); upload the key file to the site root so it is publicly reachable"
                );
                false
            }
            Err(e) => {
                error!(error = %e, "IndexNow submission failed");
                false
            }
        }
    }

    async fn ping(&self, engine: &str, endpoint: &str) -> bool {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        match ping_sitemap(self.client, endpoint, &self.site.sitemap_url(), timeout).await {
            Ok(()) => {
                info!(engine, "Sitemap ping accepted");
                true
            }
            Err(e) => {
                warn!(engine, error = %e, "Sitemap ping failed");
                false
            }
        }
    }
}

impl IndexNotify for IndexNotifier<'_> {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn notify(&self, url: &str) -> IndexReport {
        let report = IndexReport {
            indexnow: self.indexnow(url).await,
            google: self.ping("google", &self.config.google_ping_endpoint).await,
            bing: self.ping("bing", &self.config.bing_ping_endpoint).await,
        };
        info!(
            indexnow = mark(report.indexnow),
            google = mark(report.google),
            bing = mark(report.bing),
            "Indexing summary"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client, serve};
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::StatusCode as AxumStatus,
        routing::{get, post},
    };
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn site() -> SiteConfig {
        SiteConfig {
            base_url: "https://blog.example".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_site_host_drops_scheme() {
        assert_eq!(site_host(&site()), "blog.example");
        let odd = SiteConfig {
            base_url: "not a url".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(site_host(&odd), "not a url");
    }

    #[tokio::test]
    async fn test_key_is_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("indexnow_key.txt");

        let key = get_or_create_key(&path, &site()).await.unwrap();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let again = get_or_create_key(&path, &site()).await.unwrap();
        assert_eq!(again, key);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), key);
    }

    #[derive(Clone, Default)]
    struct Hits {
        indexnow: Arc<AtomicUsize>,
        pings: Arc<AtomicUsize>,
    }

    async fn engines(indexnow_status: AxumStatus) -> (String, Hits) {
        let hits = Hits::default();
        let app = Router::new()
            .route(
                "/indexnow",
                post(move |State(h): State<Hits>, Json(body): Json<Value>| async move {
                    h.indexnow.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(body["host"], "blog.example");
                    assert_eq!(body["urlList"][0], "https://blog.example/blog/x");
                    let key = body["key"].as_str().unwrap_or_default().to_string();
                    assert_eq!(body["keyLocation"], format!("https://blog.example/{key}.txt"));
                    indexnow_status
                }),
            )
            .route(
                "/ping",
                get(|State(h): State<Hits>, Query(q): Query<HashMap<String, String>>| async move {
                    h.pings.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(
                        q.get("sitemap").map(String::as_str),
                        Some("https://blog.example/sitemap.xml")
                    );
                    AxumStatus::OK
                }),
            )
            .with_state(hits.clone());
        (serve(app).await, hits)
    }

    #[tokio::test]
    async fn test_forbidden_indexnow_does_not_stop_pings() {
        let (base, hits) = engines(AxumStatus::FORBIDDEN).await;
        let dir = tempfile::tempdir().unwrap();
        let http = client();
        let cfg = IndexingConfig {
            indexnow_endpoint: format!("{base}/indexnow"),
            google_ping_endpoint: format!("{base}/ping"),
            bing_ping_endpoint: format!("{base}/ping"),
            timeout_secs: 5,
        };
        let site = site();
        let notifier = IndexNotifier {
            client: &http,
            config: &cfg,
            site: &site,
            key_path: dir.path().join("indexnow_key.txt"),
        };

        let report = notifier.notify("https://blog.example/blog/x").await;

        assert_eq!(
            report,
            IndexReport {
                indexnow: false,
                google: true,
                bing: true
            }
        );
        assert!(report.any_succeeded());
        assert_eq!(hits.indexnow.load(Ordering::SeqCst), 1);
        assert_eq!(hits.pings.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_indexnow_status_classification() {
        let http = client();
        let key = "0123456789abcdef0123456789abcdef01234567";

        for (status, check) in [
            (AxumStatus::ACCEPTED, 0),
            (AxumStatus::FORBIDDEN, 1),
            (AxumStatus::UNPROCESSABLE_ENTITY, 2),
            (AxumStatus::TOO_MANY_REQUESTS, 3),
        ] {
            let (base, _) = engines(status).await;
            let cfg = IndexingConfig {
                indexnow_endpoint: format!("{base}/indexnow"),
                ..IndexingConfig::default()
            };
            let result =
                submit_indexnow(&http, &cfg, &site(), key, &["https://blog.example/blog/x"]).await;
            match check {
                0 => assert!(result.is_ok()),
                1 => assert!(matches!(result, Err(IndexError::KeyNotHosted { .. }))),
                2 => assert!(matches!(result, Err(IndexError::HostMismatch))),
                _ => assert!(matches!(result, Err(IndexError::Rejected { status: 429, .. }))),
            }
        }
    }

    #[tokio::test]
    async fn test_all_failed_report() {
        let dir = tempfile::tempdir().unwrap();
        let http = client();
        let cfg = IndexingConfig {
            indexnow_endpoint: "http://127.0.0.1:1/indexnow".to_string(),
            google_ping_endpoint: "http://127.0.0.1:1/ping".to_string(),
            bing_ping_endpoint: "http://127.0.0.1:1/ping".to_string(),
            timeout_secs: 2,
        };
        let site = site();
        let notifier = IndexNotifier {
            client: &http,
            config: &cfg,
            site: &site,
            key_path: dir.path().join("indexnow_key.txt"),
        };
        assert!(!notifier.notify("https://blog.example/blog/x").await.any_succeeded());
    }
}
