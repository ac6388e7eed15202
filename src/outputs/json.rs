//! JSON backup of accepted posts.
//!
//! Each post the backend accepts is also written locally as
//! `{output_dir}/{slug}.json`, holding the submitted fields plus the `_meta`
//! block that never leaves this machine.

use crate::error::StoreError;
use crate::models::GeneratedPost;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write `post` as pretty-printed JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_backup(post: &GeneratedPost, path: &Path) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(post).map_err(|e| StoreError::json(path, e))?;

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))?;
    }

    fs::write(path, json)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    info!(slug = %post.slug(), "Wrote post backup");
    Ok(())
}
