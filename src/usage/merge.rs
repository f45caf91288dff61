use std::fmt::Display;

use chrono::{DateTime, Utc};

use super::parser::parse_timestamp;
use super::types::{LimitSource, LimitWindow, RateLimitInfo, RateLimits, WindowInfo};
use super::windows::minutes_until;
use crate::remote::types::{UtilizationSnapshot, UtilizationWindow};

/// Outcome of asking one data source for its data.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult<T> {
    Available(T),
    Unavailable(String),
}

impl<T> SourceResult<T> {
    pub fn available(&self) -> Option<&T> {
        match self {
            SourceResult::Available(data) => Some(data),
            SourceResult::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SourceResult::Available(_))
    }
}

impl<T, E: Display> From<Result<T, E>> for SourceResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => SourceResult::Available(data),
            Err(err) => SourceResult::Unavailable(err.to_string()),
        }
    }
}

/// Token ceilings the local estimate is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub session_tokens: u64,
    pub weekly_tokens: u64,
}

/// Reconcile locally estimated windows with the remote snapshot.
///
/// Per window, the first available wins: remote utilization, then the local
/// estimate against the plan ceiling, then an empty state when the logs show
/// no activity. Local token counts are kept in every case.
pub fn merge_rate_limits(
    local: RateLimitInfo,
    remote: &SourceResult<UtilizationSnapshot>,
    limits: PlanLimits,
    now: DateTime<Utc>,
) -> RateLimits {
    let snapshot = remote.available();

    RateLimits {
        session: merge_window(
            local.session,
            snapshot.and_then(|s| s.five_hour.as_ref()),
            limits.session_tokens,
            now,
        ),
        weekly: merge_window(
            local.weekly,
            snapshot.and_then(|s| s.seven_day.as_ref()),
            limits.weekly_tokens,
            now,
        ),
        weekly_opus: snapshot.and_then(|s| s.seven_day_opus.clone()),
    }
}

fn merge_window(
    local: WindowInfo,
    remote: Option<&UtilizationWindow>,
    token_limit: u64,
    now: DateTime<Utc>,
) -> LimitWindow {
    if let Some(remote) = remote {
        let resets_at = remote
            .resets_at
            .as_deref()
            .and_then(parse_timestamp)
            .filter(|reset| *reset > now);
        return LimitWindow {
            source: LimitSource::Remote,
            percent_used: remote.utilization,
            minutes_until_reset: resets_at.map(|reset| minutes_until(reset, now)),
            resets_at,
            token_limit,
            local,
        };
    }

    if local.has_activity() {
        // Same 0-100 range as remote utilization; overflow stays visible in
        // `local.tokens_used` against `token_limit`
        let percent_used = if token_limit > 0 {
            (local.tokens_used as f64 / token_limit as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        return LimitWindow {
            source: LimitSource::LocalEstimate,
            percent_used,
            resets_at: local.resets_at,
            minutes_until_reset: local.minutes_until_reset,
            token_limit,
            local,
        };
    }

    LimitWindow {
        source: LimitSource::Empty,
        percent_used: 0.0,
        resets_at: None,
        minutes_until_reset: None,
        token_limit,
        local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap()
    }

    fn limits() -> PlanLimits {
        PlanLimits {
            session_tokens: 10_000,
            weekly_tokens: 100_000,
        }
    }

    fn active_window(hours: u32, tokens_used: u64) -> WindowInfo {
        let now = now();
        WindowInfo {
            tokens_used,
            input_tokens: tokens_used,
            sessions_active: 1,
            oldest_message_time: Some(now - Duration::hours(1)),
            resets_at: Some(now + Duration::hours(i64::from(hours) - 1)),
            minutes_until_reset: Some((hours - 1) * 60),
            ..WindowInfo::empty(hours)
        }
    }

    fn local() -> RateLimitInfo {
        RateLimitInfo {
            session: active_window(5, 4_500),
            weekly: active_window(168, 25_000),
        }
    }

    #[test]
    fn test_remote_overrides_only_its_window() {
        let remote = SourceResult::Available(UtilizationSnapshot {
            five_hour: Some(UtilizationWindow {
                utilization: 82.3,
                resets_at: Some("2026-02-05T14:30:00Z".to_string()),
            }),
            seven_day: None,
            seven_day_opus: None,
        });
        let merged = merge_rate_limits(local(), &remote, limits(), now());

        assert_eq!(merged.session.source, LimitSource::Remote);
        assert_eq!(merged.session.percent_used, 82.3);
        assert_eq!(
            merged.session.resets_at,
            Some(Utc.with_ymd_and_hms(2026, 2, 5, 14, 30, 0).unwrap())
        );
        assert_eq!(merged.session.minutes_until_reset, Some(150));
        assert_eq!(merged.session.local.tokens_used, 4_500);

        assert_eq!(merged.weekly.source, LimitSource::LocalEstimate);
        assert!((merged.weekly.percent_used - 25.0).abs() < 1e-9);
        assert_eq!(merged.weekly.resets_at, local().weekly.resets_at);
    }

    #[test]
    fn test_unavailable_remote_falls_back_to_local_estimate() {
        let remote = SourceResult::Unavailable("unauthorized".to_string());
        let merged = merge_rate_limits(local(), &remote, limits(), now());

        assert_eq!(merged.session.source, LimitSource::LocalEstimate);
        assert!((merged.session.percent_used - 45.0).abs() < 1e-9);
        assert_eq!(merged.session.token_limit, 10_000);
        assert!(merged.weekly_opus.is_none());
    }

    #[test]
    fn test_no_logs_and_no_remote_is_empty() {
        let empty = RateLimitInfo {
            session: WindowInfo::empty(5),
            weekly: WindowInfo::empty(168),
        };
        let remote = SourceResult::Unavailable("offline".to_string());
        let merged = merge_rate_limits(empty, &remote, limits(), now());

        assert_eq!(merged.session.source, LimitSource::Empty);
        assert_eq!(merged.session.percent_used, 0.0);
        assert!(merged.session.resets_at.is_none());
        assert_eq!(merged.weekly.source, LimitSource::Empty);
    }

    #[test]
    fn test_remote_reset_in_past_is_dropped() {
        let remote = SourceResult::Available(UtilizationSnapshot {
            seven_day: Some(UtilizationWindow {
                utilization: 10.0,
                resets_at: Some("2026-02-05T11:00:00Z".to_string()),
            }),
            seven_day_opus: Some(UtilizationWindow {
                utilization: 3.0,
                resets_at: None,
            }),
            ..Default::default()
        });
        let merged = merge_rate_limits(local(), &remote, limits(), now());

        assert_eq!(merged.weekly.source, LimitSource::Remote);
        assert!(merged.weekly.resets_at.is_none());
        assert!(merged.weekly.minutes_until_reset.is_none());
        assert_eq!(merged.weekly_opus.map(|w| w.utilization), Some(3.0));
    }

    #[test]
    fn test_local_estimate_caps_at_full() {
        let over = RateLimitInfo {
            session: active_window(5, 88_000),
            weekly: active_window(168, 25_000),
        };
        let ceiling = PlanLimits {
            session_tokens: 44_000,
            weekly_tokens: 100_000,
        };
        let merged = merge_rate_limits(
            over,
            &SourceResult::Unavailable("offline".to_string()),
            ceiling,
            now(),
        );

        assert_eq!(merged.session.source, LimitSource::LocalEstimate);
        assert_eq!(merged.session.percent_used, 100.0);
        assert_eq!(merged.session.local.tokens_used, 88_000);
        assert_eq!(merged.session.token_limit, 44_000);
        assert!((merged.weekly.percent_used - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_plan_ceiling_reports_zero_percent() {
        let zero = PlanLimits {
            session_tokens: 0,
            weekly_tokens: 0,
        };
        let merged = merge_rate_limits(
            local(),
            &SourceResult::Unavailable("offline".to_string()),
            zero,
            now(),
        );
        assert_eq!(merged.session.percent_used, 0.0);
    }

    #[test]
    fn test_source_result_from_result() {
        let ok: SourceResult<u8> = Ok::<u8, String>(1).into();
        let err: SourceResult<u8> = Err::<u8, String>("boom".to_string()).into();
        assert_eq!(ok.available(), Some(&1));
        assert_eq!(err, SourceResult::Unavailable("boom".to_string()));
        assert!(!err.is_available());
    }
}
