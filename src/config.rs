use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::remote::api::USAGE_API_URL;
use crate::usage::merge::PlanLimits;
use crate::usage::pricing::UnknownModelPolicy;

const APP_NAME: &str = "tokenmeter";
const CONFIG_NAME: &str = "config";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logs: LogsConfig,
    pub refresh: RefreshConfig,
    pub plan: PlanConfig,
    pub pricing: PricingConfig,
    pub remote: RemoteConfig,
    pub legacy: LegacyConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Directories searched recursively; `~` and `$VAR` are expanded
    pub roots: Vec<String>,
    pub lookback_days: u32,
    pub extension: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            roots: vec![
                "~/.claude/projects".to_string(),
                "~/.config/claude/projects".to_string(),
            ],
            lookback_days: 30,
            extension: "jsonl".to_string(),
        }
    }
}

impl LogsConfig {
    /// Roots with `~` and environment variables expanded.
    ///
    /// A root that fails to expand is used verbatim.
    pub fn expanded_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| match shellexpand::full(root) {
                Ok(expanded) => PathBuf::from(expanded.as_ref()),
                Err(_) => PathBuf::from(root),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

/// Subscription tier, used only for the local rate-limit estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Pro,
    Max5,
    Max20,
}

impl PlanTier {
    /// Rough input+output token ceilings per 5-hour and 7-day window.
    /// These are community estimates; the real limits are not published.
    pub fn default_limits(self) -> PlanLimits {
        let (session_tokens, weekly_tokens) = match self {
            PlanTier::Pro => (44_000, 1_000_000),
            PlanTier::Max5 => (88_000, 5_000_000),
            PlanTier::Max20 => (220_000, 20_000_000),
        };
        PlanLimits {
            session_tokens,
            weekly_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub tier: PlanTier,
    pub session_token_limit: Option<u64>,
    pub weekly_token_limit: Option<u64>,
}

impl PlanConfig {
    pub fn limits(&self) -> PlanLimits {
        let defaults = self.tier.default_limits();
        PlanLimits {
            session_tokens: self.session_token_limit.unwrap_or(defaults.session_tokens),
            weekly_tokens: self.weekly_token_limit.unwrap_or(defaults.weekly_tokens),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub unknown_models: UnknownModelPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: USAGE_API_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    pub enabled: bool,
    pub binary: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 7878 }
    }
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load_config() -> Result<Config> {
    confy::load(APP_NAME, CONFIG_NAME).context("Failed to load config")
}

pub fn save_config(config: &Config) -> Result<()> {
    confy::store(APP_NAME, CONFIG_NAME, config).context("Failed to save config")
}

pub fn config_path() -> Result<PathBuf> {
    confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
        .context("Failed to resolve config path")
}
