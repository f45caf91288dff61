use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::types::{DailyUsage, RateLimits, UsageSummary};

/// Days, including today, that count toward the week rollup
const WEEK_DAYS: i64 = 7;

/// Assemble the summary and its today/week/month rollups.
///
/// `today` is the local calendar date the daily buckets are keyed by.
pub fn build_summary(
    daily: Vec<DailyUsage>,
    rate_limits: RateLimits,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> UsageSummary {
    let today_str = today.format("%Y-%m-%d").to_string();
    let today_data = daily.iter().find(|d| d.date == today_str);

    let today_cost = today_data.map(|d| d.total_cost).unwrap_or(0.0);
    let today_tokens = today_data.map(|d| d.total_tokens).unwrap_or(0);
    let today_model_breakdowns = today_data
        .map(|d| d.model_breakdowns.clone())
        .unwrap_or_default();

    let week_start = today - Duration::days(WEEK_DAYS - 1);
    let month_start = today.with_day(1).unwrap_or(today);

    let week_cost = cost_since(&daily, week_start, today);
    let month_cost = cost_since(&daily, month_start, today);

    UsageSummary {
        daily,
        today_cost,
        week_cost,
        month_cost,
        today_tokens,
        today_model_breakdowns,
        rate_limits,
        last_updated: now,
    }
}

/// Sum of daily costs with `start <= date <= end`. Unparseable dates are skipped.
fn cost_since(daily: &[DailyUsage], start: NaiveDate, end: NaiveDate) -> f64 {
    daily
        .iter()
        .filter(|d| {
            NaiveDate::parse_from_str(&d.date, "%Y-%m-%d")
                .map(|date| date >= start && date <= end)
                .unwrap_or(false)
        })
        .map(|d| d.total_cost)
        .sum()
}
