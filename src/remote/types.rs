use serde::{Deserialize, Serialize};

/// Utilization for one window as reported by the usage endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationWindow {
    /// Percentage of the ceiling consumed (0-100)
    pub utilization: f64,
    /// ISO timestamp when the limit resets
    #[serde(default)]
    pub resets_at: Option<String>,
}

/// Usage endpoint response. Any window may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSnapshot {
    #[serde(default)]
    pub five_hour: Option<UtilizationWindow>,
    #[serde(default)]
    pub seven_day: Option<UtilizationWindow>,
    #[serde(default)]
    pub seven_day_opus: Option<UtilizationWindow>,
}

/// OAuth credentials structure written by Claude Code
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaudeCredentialsFile {
    pub claude_ai_oauth: Option<OAuthCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCredentials {
    pub access_token: String,
}
