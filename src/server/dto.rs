use serde::Serialize;

use crate::config::{Config, PlanTier};
use crate::usage::pricing::UnknownModelPolicy;

/// Generic API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Effective settings, with plan ceilings resolved
#[derive(Serialize)]
pub struct ConfigDto {
    pub log_roots: Vec<String>,
    pub lookback_days: u32,
    pub refresh_interval_secs: u64,
    pub plan: PlanTier,
    pub session_token_limit: u64,
    pub weekly_token_limit: u64,
    pub unknown_models: UnknownModelPolicy,
    pub remote_enabled: bool,
    pub legacy_enabled: bool,
}

impl From<&Config> for ConfigDto {
    fn from(config: &Config) -> Self {
        let limits = config.plan.limits();
        Self {
            log_roots: config
                .logs
                .expanded_roots()
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            lookback_days: config.logs.lookback_days,
            refresh_interval_secs: config.refresh.interval_secs,
            plan: config.plan.tier,
            session_token_limit: limits.session_tokens,
            weekly_token_limit: limits.weekly_tokens,
            unknown_models: config.pricing.unknown_models,
            remote_enabled: config.remote.enabled,
            legacy_enabled: config.legacy.enabled,
        }
    }
}

#[derive(Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub version: &'static str,
    pub has_snapshot: bool,
}
