use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::error::LegacyError;
use crate::usage::types::DailyUsage;

const BINARY_NAME: &str = "ccusage";

/// Daily records from the external `ccusage` binary.
#[derive(Debug, Clone, Default)]
pub struct LegacyProvider {
    configured: Option<PathBuf>,
}

/// `ccusage daily --json` has emitted both a bare array and `{"daily": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum DailyOutput {
    Bare(Vec<DailyUsage>),
    Wrapped { daily: Vec<DailyUsage> },
}

impl LegacyProvider {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self { configured }
    }

    /// Locate the binary: configured path, then NVM installs, then `PATH`,
    /// then common global locations.
    pub fn resolve_binary(&self) -> Result<PathBuf, LegacyError> {
        if let Some(path) = &self.configured {
            return if path.is_file() {
                Ok(path.clone())
            } else {
                Err(LegacyError::BinaryNotFound)
            };
        }

        if let Some(home) = dirs::home_dir() {
            let nvm_base = home.join(".nvm").join("versions").join("node");
            if let Ok(entries) = std::fs::read_dir(&nvm_base) {
                let mut versions: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
                // Newest version first
                versions.sort();
                versions.reverse();
                if let Some(found) = versions
                    .into_iter()
                    .map(|v| v.join("bin").join(BINARY_NAME))
                    .find(|candidate| candidate.is_file())
                {
                    return Ok(found);
                }
            }
        }

        if let Ok(path) = which::which(BINARY_NAME) {
            return Ok(path);
        }

        ["/usr/local/bin/ccusage", "/opt/homebrew/bin/ccusage"]
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
            .map(Path::to_path_buf)
            .ok_or(LegacyError::BinaryNotFound)
    }

    /// Run `ccusage daily --json --since YYYYMMDD --until YYYYMMDD`.
    ///
    /// Blocks until the process exits. A non-zero exit or unparseable output
    /// fails the whole call.
    pub fn fetch_daily(
        &self,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DailyUsage>, LegacyError> {
        let bin = self.resolve_binary()?;
        let since = since.format("%Y%m%d").to_string();
        let until = until.format("%Y%m%d").to_string();
        debug!("running {} daily --since {since} --until {until}", bin.display());

        let output = Command::new(&bin)
            .args(["daily", "--json", "--since", &since, "--until", &until])
            .output()
            .map_err(|e| LegacyError::ExecutionFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LegacyError::ExecutionFailed(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|e| LegacyError::Parse(e.to_string()))?;
        parse_daily_output(&stdout)
    }
}

/// Decode the daily records printed by the binary, sorted by date.
pub fn parse_daily_output(stdout: &str) -> Result<Vec<DailyUsage>, LegacyError> {
    let output: DailyOutput =
        serde_json::from_str(stdout.trim()).map_err(|e| LegacyError::Parse(e.to_string()))?;
    let mut daily = match output {
        DailyOutput::Bare(daily) | DailyOutput::Wrapped { daily } => daily,
    };
    daily.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(daily)
}
