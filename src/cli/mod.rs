pub mod commands;

use std::path::PathBuf;

use clap::Args;

use crate::config::{Config, PlanTier};

/// Overrides for where usage data comes from, shared by the data commands
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Log root to scan instead of the configured ones (repeatable)
    #[arg(long = "root", value_name = "DIR", env = "TOKENMETER_LOG_ROOT")]
    pub roots: Vec<PathBuf>,

    /// Plan tier used for the local rate-limit estimate
    #[arg(long, value_enum, env = "TOKENMETER_PLAN")]
    pub plan: Option<PlanTier>,

    /// Skip the remote utilization endpoint
    #[arg(long)]
    pub offline: bool,
}

impl SourceArgs {
    pub fn apply(&self, config: &mut Config) {
        if !self.roots.is_empty() {
            config.logs.roots = self
                .roots
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect();
        }
        if let Some(tier) = self.plan {
            config.plan.tier = tier;
        }
        if self.offline {
            config.remote.enabled = false;
        }
    }
}
