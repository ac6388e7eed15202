//! Published-slug ledger.
//!
//! A JSON array of every slug this installation has submitted, read at the
//! start of each run and rewritten after a successful publish. The file is
//! replaced by writing a sibling temp file and renaming it over the old one,
//! so a crash mid-write leaves the previous ledger intact. Only one process
//! is expected to touch it at a time.

use crate::error::StoreError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    slugs: BTreeSet<String>,
}

impl Ledger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let slugs = match fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => BTreeSet::new(),
            Ok(raw) => {
                let list: Vec<String> =
                    serde_json::from_str(&raw).map_err(|e| StoreError::json(&path, e))?;
                list.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No ledger yet; starting empty");
                BTreeSet::new()
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        info!(count = slugs.len(), "Ledger loaded");
        Ok(Self { path, slugs })
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    /// Record `slug` and persist. Returns whether it was new.
    pub async fn record(&mut self, slug: &str) -> Result<bool, StoreError> {
        let added = self.slugs.insert(slug.to_string());
        if added {
            self.save().await?;
        }
        Ok(added)
    }

    async fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(&self.slugs)
            .map_err(|e| StoreError::json(&self.path, e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}
