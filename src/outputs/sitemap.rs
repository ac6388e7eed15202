//! Sitemap XML rendering.
//!
//! Produces a `urlset` in the sitemaps.org 0.9 namespace: the home page
//! first (`daily`, `1.0`), then one `<url>` per entry in the order given
//! (`monthly`, `0.8`). The same entries always render to the same bytes.

use crate::config::SiteConfig;
use crate::error::StoreError;
use crate::models::SitemapEntry;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{self, Write};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_url<W: Write>(
    w: &mut Writer<W>,
    loc: &str,
    lastmod: &str,
    changefreq: &str,
    priority: &str,
) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new("url")))?;
    write_text_element(w, "loc", loc)?;
    write_text_element(w, "lastmod", lastmod)?;
    write_text_element(w, "changefreq", changefreq)?;
    write_text_element(w, "priority", priority)?;
    w.write_event(Event::End(BytesEnd::new("url")))?;
    Ok(())
}

/// Render the sitemap document for `entries`.
pub fn render_sitemap(site: &SiteConfig, entries: &[SitemapEntry], today: &str) -> io::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    writer.write_event(Event::Start(urlset))?;

    write_url(&mut writer, &format!("{}/", site.base()), today, "daily", "1.0")?;
    for entry in entries {
        let loc = site.post_url(&urlencoding::encode(&entry.slug));
        write_url(&mut writer, &loc, &entry.lastmod, "monthly", "0.8")?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Render and write the sitemap to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), entries = entries.len()))]
pub async fn write_sitemap(
    site: &SiteConfig,
    entries: &[SitemapEntry],
    today: &str,
    path: &Path,
) -> Result<(), StoreError> {
    let xml = render_sitemap(site, entries, today).map_err(|e| StoreError::io(path, e))?;
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))?;
    }
    fs::write(path, xml)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    info!(
        url_count = entries.len() + 1,
        "Sitemap written; upload it to the site root"
    );
    Ok(())
}
