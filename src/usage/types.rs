use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::remote::types::UtilizationWindow;

/// The four token categories reported in a usage block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
    pub cache_creation: u64,
    pub cache_read: u64,
}

impl TokenCounts {
    pub fn total(&self) -> u64 {
        self.input + self.output + self.cache_creation + self.cache_read
    }

    pub fn add(&mut self, other: &TokenCounts) {
        self.input += other.input;
        self.output += other.output;
        self.cache_creation += other.cache_creation;
        self.cache_read += other.cache_read;
    }
}

/// A single assistant turn parsed from a session log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    /// Correlates the lines written for one upstream API call.
    pub request_id: Option<String>,
    pub model: String,
    pub tokens: TokenCounts,
}

/// Per-model token and cost subtotal within a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBreakdown {
    #[serde(alias = "modelName")]
    pub model_name: String,
    #[serde(default, alias = "inputTokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "outputTokens")]
    pub output_tokens: u64,
    #[serde(default, alias = "cacheCreationTokens")]
    pub cache_creation_tokens: u64,
    #[serde(default, alias = "cacheReadTokens")]
    pub cache_read_tokens: u64,
    #[serde(default)]
    pub cost: f64,
    /// Set when the model matched no known price schedule and was not priced.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unpriced: bool,
}

impl ModelBreakdown {
    pub fn tokens(&self) -> TokenCounts {
        TokenCounts {
            input: self.input_tokens,
            output: self.output_tokens,
            cache_creation: self.cache_creation_tokens,
            cache_read: self.cache_read_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens().total()
    }
}

/// Aggregated usage for a single calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Local date, `YYYY-MM-DD`
    pub date: String,
    #[serde(default, alias = "inputTokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "outputTokens")]
    pub output_tokens: u64,
    #[serde(default, alias = "cacheCreationTokens")]
    pub cache_creation_tokens: u64,
    #[serde(default, alias = "cacheReadTokens")]
    pub cache_read_tokens: u64,
    #[serde(default, alias = "totalTokens")]
    pub total_tokens: u64,
    #[serde(default, alias = "totalCost")]
    pub total_cost: f64,
    #[serde(default, alias = "modelsUsed")]
    pub models_used: Vec<String>,
    #[serde(default, alias = "modelBreakdowns")]
    pub model_breakdowns: Vec<ModelBreakdown>,
}

/// Locally estimated usage for one rate-limit window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub window_hours: u32,
    /// Input plus output tokens; cache tokens do not count toward limits.
    pub tokens_used: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub sessions_active: u32,
    pub oldest_message_time: Option<DateTime<Utc>>,
    /// Estimated reset, anchored on the oldest record still inside the window.
    pub resets_at: Option<DateTime<Utc>>,
    pub minutes_until_reset: Option<u32>,
}

impl WindowInfo {
    pub fn empty(window_hours: u32) -> Self {
        Self {
            window_hours,
            tokens_used: 0,
            input_tokens: 0,
            output_tokens: 0,
            sessions_active: 0,
            oldest_message_time: None,
            resets_at: None,
            minutes_until_reset: None,
        }
    }

    pub fn has_activity(&self) -> bool {
        self.oldest_message_time.is_some()
    }
}

/// The two locally computed windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub session: WindowInfo,
    pub weekly: WindowInfo,
}

/// Where a window's percentage and reset time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitSource {
    Remote,
    LocalEstimate,
    Empty,
}

/// A rate-limit window after reconciling local logs with remote utilization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitWindow {
    pub source: LimitSource,
    pub percent_used: f64,
    pub resets_at: Option<DateTime<Utc>>,
    pub minutes_until_reset: Option<u32>,
    /// Plan ceiling the local estimate was computed against
    pub token_limit: u64,
    /// Local token counts, always shown for context
    pub local: WindowInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimits {
    pub session: LimitWindow,
    pub weekly: LimitWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_opus: Option<UtilizationWindow>,
}

/// Snapshot handed to the presentation layer and persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Ascending by date; days without usage are absent
    pub daily: Vec<DailyUsage>,
    pub today_cost: f64,
    pub week_cost: f64,
    pub month_cost: f64,
    pub today_tokens: u64,
    pub today_model_breakdowns: Vec<ModelBreakdown>,
    pub rate_limits: RateLimits,
    pub last_updated: DateTime<Utc>,
}
