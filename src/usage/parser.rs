use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use super::types::{TokenCounts, UsageRecord};

/// Model id the CLI writes for turns it synthesizes itself
const SYNTHETIC_MODEL: &str = "<synthetic>";

const ASSISTANT_TYPE: &str = "assistant";

/// Only the type tag; decoded first so other turn kinds are never inspected further.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct AssistantEntry {
    timestamp: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    #[serde(rename = "requestId")]
    request_id: Option<String>,
    message: Option<AssistantMessage>,
}

#[derive(Deserialize)]
struct AssistantMessage {
    model: Option<String>,
    usage: Option<UsageBlock>,
}

#[derive(Deserialize)]
struct UsageBlock {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

/// Decode one log line into a usage record.
///
/// Returns `None` for anything that is not an assistant turn with a usage
/// block, a real model id and a parseable timestamp.
pub fn parse_line(line: &str) -> Option<UsageRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let envelope = Envelope::deserialize(&value).ok()?;
    if envelope.kind.as_deref() != Some(ASSISTANT_TYPE) {
        return None;
    }

    let entry = AssistantEntry::deserialize(value).ok()?;
    let message = entry.message?;
    let usage = message.usage?;
    let model = message.model?;
    if model == SYNTHETIC_MODEL {
        return None;
    }
    let timestamp = parse_timestamp(entry.timestamp.as_deref()?)?;

    Some(UsageRecord {
        timestamp,
        session_id: entry.session_id,
        request_id: entry.request_id,
        model,
        tokens: TokenCounts {
            input: usage.input_tokens.unwrap_or(0),
            output: usage.output_tokens.unwrap_or(0),
            cache_creation: usage.cache_creation_input_tokens.unwrap_or(0),
            cache_read: usage.cache_read_input_tokens.unwrap_or(0),
        },
    })
}

/// Parse an ISO 8601 timestamp with or without fractional seconds.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
