use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::usage::types::UsageSummary;

const CACHE_FILE: &str = "summary_cache.json";

/// Last good summary, persisted so a restart can show data before the first
/// refresh completes.
#[derive(Debug, Clone)]
pub struct SummaryCache {
    path: PathBuf,
}

impl SummaryCache {
    /// `<config dir>/tokenmeter/summary_cache.json`
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::at(dir.join("tokenmeter").join(CACHE_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached summary. A missing or corrupt file yields `None`.
    pub fn load(&self) -> Option<UsageSummary> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                debug!("no summary cache at {}: {err}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!("ignoring corrupt summary cache {}: {err}", self.path.display());
                None
            }
        }
    }

    /// Write through a temp file and rename, so readers never see a partial file
    pub fn save(&self, summary: &UsageSummary) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(summary)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
