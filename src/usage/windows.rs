use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::dedup::DedupedRecords;
use super::types::{RateLimitInfo, WindowInfo};

pub const SESSION_WINDOW_HOURS: u32 = 5;
pub const WEEKLY_WINDOW_HOURS: u32 = 168;

/// Build the session (5h) and weekly (168h) windows ending at `now`.
pub fn build_rate_limits(records: &DedupedRecords, now: DateTime<Utc>) -> RateLimitInfo {
    RateLimitInfo {
        session: build_window(records, SESSION_WINDOW_HOURS, now),
        weekly: build_window(records, WEEKLY_WINDOW_HOURS, now),
    }
}

/// Sum input/output tokens of every record in the trailing window.
///
/// The reset time is an estimate: the window is anchored on the oldest record
/// still inside it, so the reset moves forward as old records age out. The
/// server's real reset point is not visible in the logs. A reset at or
/// before `now` is dropped, since the next record will start a fresh anchor.
pub fn build_window(records: &DedupedRecords, window_hours: u32, now: DateTime<Utc>) -> WindowInfo {
    let length = Duration::hours(i64::from(window_hours));
    let cutoff = now - length;

    let mut window = WindowInfo::empty(window_hours);
    let mut sessions: HashSet<&str> = HashSet::new();

    for record in records.iter().filter(|r| r.timestamp >= cutoff) {
        window.input_tokens += record.tokens.input;
        window.output_tokens += record.tokens.output;
        if let Some(sid) = record.session_id.as_deref() {
            sessions.insert(sid);
        }
        window.oldest_message_time = Some(match window.oldest_message_time {
            Some(oldest) if oldest <= record.timestamp => oldest,
            _ => record.timestamp,
        });
    }

    window.tokens_used = window.input_tokens + window.output_tokens;
    window.sessions_active = u32::try_from(sessions.len()).unwrap_or(u32::MAX);

    if let Some(oldest) = window.oldest_message_time {
        let reset = oldest + length;
        if reset > now {
            window.resets_at = Some(reset);
            window.minutes_until_reset = Some(minutes_until(reset, now));
        }
    }

    window
}

/// Whole minutes from `now` until `instant`, floored.
pub fn minutes_until(instant: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let minutes = (instant - now).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
