use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

/// Enumerates session log files under a set of root directories.
///
/// Roots that do not exist are skipped: they only mean the CLI was never used
/// from that location. Files are visited in path order so a scan over an
/// unchanged tree always yields lines in the same order.
#[derive(Debug, Clone)]
pub struct LogScanner {
    roots: Vec<PathBuf>,
    extension: String,
}

impl LogScanner {
    pub fn new(roots: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            roots,
            extension: extension.into(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether at least one configured root is present on disk
    pub fn any_root_exists(&self) -> bool {
        self.roots.iter().any(|root| root.is_dir())
    }

    /// Collect log files modified at or after `modified_after`, sorted by path.
    pub fn candidate_files(&self, modified_after: DateTime<Utc>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.roots {
            if !root.is_dir() {
                debug!("log root {} not found, skipping", root.display());
                continue;
            }
            collect_log_files(root, &self.extension, &mut files);
        }

        files.retain(|path| modified_at_or_after(path, modified_after));
        files.sort();
        files.dedup();
        files
    }

    /// Lazily yield every line of every candidate file.
    ///
    /// Each file is read fully when the iterator reaches it. Unreadable or
    /// non-UTF-8 files contribute no lines.
    pub fn lines(&self, modified_after: DateTime<Utc>) -> impl Iterator<Item = String> {
        self.candidate_files(modified_after)
            .into_iter()
            .flat_map(|path| read_lines(&path))
    }
}

/// Collect all files with the given extension recursively under a directory,
/// skipping hidden entries
fn collect_log_files(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("failed to read {}: {err}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect_log_files(&path, extension, files);
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
}

/// Files whose modification time cannot be read are kept.
fn modified_at_or_after(path: &Path, cutoff: DateTime<Utc>) -> bool {
    match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified) >= cutoff,
        Err(_) => true,
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => content.lines().map(str::to_owned).collect(),
        Err(err) => {
            debug!("skipping unreadable log {}: {err}", path.display());
            Vec::new()
        }
    }
}
