//! Sitemap rebuild from the backend's post listing.
//!
//! The listing is walked page by page until an empty page, the declared last
//! page, or the first failed request. Whatever was collected up to that point
//! is used. The freshly published slug is put first when the listing does not
//! show it yet.

use crate::backend::ContentBackend;
use crate::config::{PathsConfig, SiteConfig};
use crate::error::StoreError;
use crate::models::{PostListing, SitemapEntry};
use crate::outputs::sitemap::write_sitemap;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Upper bound on listing pages, in case a backend misreports `totalPages`.
pub const MAX_LISTING_PAGES: u32 = 1000;

/// Entries from one listing page; `lastmod` falls back to `today`.
pub fn entries_from_page(page: PostListing, today: &str) -> Vec<SitemapEntry> {
    page.posts
        .into_iter()
        .filter(|p| !p.slug.trim().is_empty())
        .map(|p| SitemapEntry {
            lastmod: p
                .updated_at
                .as_deref()
                .map(|u| u.chars().take(10).collect())
                .filter(|d: &String| !d.is_empty())
                .unwrap_or_else(|| today.to_string()),
            slug: p.slug,
        })
        .collect()
}

/// Walk every listing page. Never fails; errors end the walk early.
#[instrument(level = "info", skip_all)]
pub async fn fetch_listing<B: ContentBackend>(backend: &B, today: &str) -> Vec<SitemapEntry> {
    let mut entries = Vec::new();
    let mut page = 1;

    while page <= MAX_LISTING_PAGES {
        let listing = match backend.list_posts(page).await {
            Ok(l) => l,
            Err(e) => {
                warn!(page, error = %e, "Listing request failed; using partial listing");
                break;
            }
        };
        if listing.posts.is_empty() {
            break;
        }
        let total_pages = listing.pagination.total_pages;
        entries.extend(entries_from_page(listing, today));
        if page >= total_pages {
            break;
        }
        page += 1;
    }

    info!(count = entries.len(), pages = page, "Fetched post listing");
    entries
}

/// Drop repeated slugs and make sure `new_slug` is present, at the front if
/// it had to be added.
pub fn merge_entries(listing: Vec<SitemapEntry>, new_slug: Option<&str>, today: &str) -> Vec<SitemapEntry> {
    let mut seen = HashSet::new();
    let mut entries: Vec<SitemapEntry> = listing
        .into_iter()
        .filter(|e| seen.insert(e.slug.clone()))
        .collect();

    if let Some(slug) = new_slug.filter(|s| !seen.contains(*s)) {
        info!(%slug, "New post not in listing yet; adding it");
        entries.insert(
            0,
            SitemapEntry {
                slug: slug.to_string(),
                lastmod: today.to_string(),
            },
        );
    }
    entries
}

/// Rebuild and write the sitemap. Returns the number of post entries.
#[instrument(level = "info", skip_all)]
pub async fn regenerate<B: ContentBackend>(
    backend: &B,
    site: &SiteConfig,
    paths: &PathsConfig,
    new_slug: Option<&str>,
    today: &str,
) -> Result<usize, StoreError> {
    let listing = fetch_listing(backend, today).await;
    let entries = merge_entries(listing, new_slug, today);
    write_sitemap(site, &entries, today, &paths.sitemap_path()).await?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::models::{ListedPost, Pagination, PostPayload};
    use std::cell::Cell;

    /// Serves `pages` in order, then fails.
    struct PagedBackend {
        pages: Vec<Vec<&'static str>>,
        total_pages: u32,
        calls: Cell<u32>,
    }

    impl ContentBackend for PagedBackend {
        async fn login(&self) -> Result<String, BackendError> {
            unreachable!()
        }

        async fn create_post(&self, _: &str, _: &PostPayload) -> Result<Option<String>, BackendError> {
            unreachable!()
        }

        async fn list_posts(&self, page: u32) -> Result<PostListing, BackendError> {
            self.calls.set(self.calls.get() + 1);
            let Some(slugs) = self.pages.get(page as usize - 1) else {
                return Err(BackendError::Timeout);
            };
            Ok(PostListing {
                posts: slugs
                    .iter()
                    .map(|s| ListedPost {
                        slug: s.to_string(),
                        updated_at: Some("2025-04-30T08:00:00.000Z".to_string()),
                    })
                    .collect(),
                pagination: Pagination {
                    total_pages: self.total_pages,
                },
            })
        }
    }

    fn backend(pages: Vec<Vec<&'static str>>, total_pages: u32) -> PagedBackend {
        PagedBackend {
            pages,
            total_pages,
            calls: Cell::new(0),
        }
    }

    #[tokio::test]
    async fn test_walks_until_declared_last_page() {
        let b = backend(vec![vec!["a", "b"], vec!["c"], vec!["never"]], 2);
        let entries = fetch_listing(&b, "2025-05-06").await;
        let slugs: Vec<_> = entries.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, ["a", "b", "c"]);
        assert_eq!(entries[0].lastmod, "2025-04-30");
        assert_eq!(b.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let b = backend(vec![vec!["a"], vec![], vec!["never"]], 10);
        let entries = fetch_listing(&b, "2025-05-06").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(b.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_error_keeps_partial_listing() {
        // page 3 does not exist and errors
        let b = backend(vec![vec!["a"], vec!["b"]], 5);
        let entries = fetch_listing(&b, "2025-05-06").await;
        assert_eq!(entries.len(), 2);
        assert_eq!(b.calls.get(), 3);
    }

    #[test]
    fn test_lastmod_defaults_to_today() {
        let page = PostListing {
            posts: vec![ListedPost {
                slug: "x".to_string(),
                updated_at: None,
            }],
            pagination: Pagination::default(),
        };
        assert_eq!(entries_from_page(page, "2025-05-06")[0].lastmod, "2025-05-06");
    }

    #[test]
    fn test_merge_injects_new_slug_once() {
        let listing = vec![
            SitemapEntry {
                slug: "a".to_string(),
                lastmod: "2025-05-01".to_string(),
            },
            SitemapEntry {
                slug: "a".to_string(),
                lastmod: "2025-05-02".to_string(),
            },
            SitemapEntry {
                slug: "b".to_string(),
                lastmod: "2025-05-01".to_string(),
            },
        ];

        let merged = merge_entries(listing.clone(), Some("fresh"), "2025-05-06");
        let slugs: Vec<_> = merged.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, ["fresh", "a", "b"]);
        assert_eq!(merged[0].lastmod, "2025-05-06");

        let merged = merge_entries(listing, Some("b"), "2025-05-06");
        let slugs: Vec<_> = merged.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_regenerate_has_one_home_and_distinct_slugs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            data_dir: dir.path().join("data"),
            output_dir: dir.path().join("output"),
        };
        let site = SiteConfig {
            base_url: "https://blog.example".to_string(),
            ..SiteConfig::default()
        };
        let b = backend(vec![vec!["a", "b", "a"], vec!["c", "b"]], 2);

        let count = regenerate(&b, &site, &paths, Some("new"), "2025-05-06")
            .await
            .unwrap();
        assert_eq!(count, 4);

        let xml = std::fs::read_to_string(paths.sitemap_path()).unwrap();
        assert_eq!(xml.matches("<loc>https://blog.example/</loc>").count(), 1);
        for slug in ["new", "a", "b", "c"] {
            let loc = format!("<loc>https://blog.example/blog/{slug}</loc>");
            assert_eq!(xml.matches(&loc).count(), 1, "{slug}");
        }
        assert_eq!(xml.matches("<url>").count(), 5);
    }
}
