use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, TimeZone, Utc};

use super::dedup::DedupedRecords;
use super::pricing::PricingTable;
use super::types::{DailyUsage, ModelBreakdown, TokenCounts};

#[derive(Default)]
struct DayAccum {
    totals: TokenCounts,
    /// Per-model sums in first-seen order
    models: Vec<(String, TokenCounts)>,
    model_index: HashMap<String, usize>,
}

impl DayAccum {
    fn add(&mut self, model: &str, tokens: &TokenCounts) {
        self.totals.add(tokens);
        let idx = match self.model_index.get(model) {
            Some(&idx) => idx,
            None => {
                self.models.push((model.to_string(), TokenCounts::default()));
                self.model_index.insert(model.to_string(), self.models.len() - 1);
                self.models.len() - 1
            }
        };
        self.models[idx].1.add(tokens);
    }

    fn into_daily(self, date: String, pricing: &PricingTable) -> DailyUsage {
        let mut model_breakdowns: Vec<ModelBreakdown> = self
            .models
            .into_iter()
            .map(|(model_name, tokens)| {
                let cost = pricing.calculate_cost(&model_name, &tokens);
                ModelBreakdown {
                    input_tokens: tokens.input,
                    output_tokens: tokens.output,
                    cache_creation_tokens: tokens.cache_creation,
                    cache_read_tokens: tokens.cache_read,
                    cost: cost.unwrap_or(0.0),
                    unpriced: cost.is_none(),
                    model_name,
                }
            })
            .collect();
        // Stable sort keeps first-seen order among equal costs
        model_breakdowns.sort_by(|a, b| b.cost.total_cmp(&a.cost));

        let models_used: BTreeSet<String> = model_breakdowns
            .iter()
            .map(|b| b.model_name.clone())
            .collect();
        let total_cost = model_breakdowns.iter().map(|b| b.cost).sum();

        DailyUsage {
            date,
            input_tokens: self.totals.input,
            output_tokens: self.totals.output,
            cache_creation_tokens: self.totals.cache_creation,
            cache_read_tokens: self.totals.cache_read,
            total_tokens: self.totals.total(),
            total_cost,
            models_used: models_used.into_iter().collect(),
            model_breakdowns,
        }
    }
}

/// Bucket records by calendar day in `tz`, then by model.
///
/// Records older than `since` are ignored. Days without records are absent
/// from the result, which is sorted ascending by date.
pub fn aggregate_daily<Tz: TimeZone>(
    records: &DedupedRecords,
    since: DateTime<Utc>,
    pricing: &PricingTable,
    tz: &Tz,
) -> Vec<DailyUsage> {
    let mut days: BTreeMap<String, DayAccum> = BTreeMap::new();

    for record in records.iter().filter(|r| r.timestamp >= since) {
        let date = record
            .timestamp
            .with_timezone(tz)
            .date_naive()
            .format("%Y-%m-%d")
            .to_string();
        days.entry(date)
            .or_default()
            .add(&record.model, &record.tokens);
    }

    days.into_iter()
        .map(|(date, accum)| accum.into_daily(date, pricing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::dedup::deduplicate;
    use crate::usage::pricing::UnknownModelPolicy;
    use crate::usage::types::UsageRecord;
    use chrono::{Duration, FixedOffset};

    fn record(
        ts: DateTime<Utc>,
        request_id: Option<&str>,
        model: &str,
        tokens: TokenCounts,
    ) -> UsageRecord {
        UsageRecord {
            timestamp: ts,
            session_id: Some("s1".to_string()),
            request_id: request_id.map(str::to_string),
            model: model.to_string(),
            tokens,
        }
    }

    fn io(input: u64, output: u64) -> TokenCounts {
        TokenCounts {
            input,
            output,
            ..Default::default()
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, day, hour, 0, 0).unwrap()
    }

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(0, 0).unwrap()
    }

    #[test]
    fn test_duplicate_request_counts_once() {
        let now = Utc::now();
        let records = deduplicate(vec![
            record(now, Some("req-1"), "claude-sonnet-4", io(100, 50)),
            record(now, Some("req-1"), "claude-sonnet-4", io(100, 50)),
        ]);
        let daily = aggregate_daily(&records, now - Duration::days(1), &PricingTable::default(), &Utc);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, now.format("%Y-%m-%d").to_string());
        assert_eq!(daily[0].input_tokens, 100);
        assert_eq!(daily[0].output_tokens, 50);
        assert!((daily[0].total_cost - 0.00105).abs() < 1e-12);
    }

    #[test]
    fn test_days_sorted_and_gaps_not_filled() {
        let records = deduplicate(vec![
            record(at(9, 10), None, "claude-sonnet-4", io(1, 1)),
            record(at(5, 10), None, "claude-sonnet-4", io(1, 1)),
            record(at(7, 10), None, "claude-sonnet-4", io(1, 1)),
        ]);
        let daily = aggregate_daily(&records, epoch(), &PricingTable::default(), &Utc);
        let dates: Vec<&str> = daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2026-02-05", "2026-02-07", "2026-02-09"]);
    }

    #[test]
    fn test_records_before_cutoff_are_excluded() {
        let records = deduplicate(vec![
            record(at(5, 10), None, "claude-sonnet-4", io(1, 1)),
            record(at(6, 10), None, "claude-sonnet-4", io(2, 2)),
        ]);
        let daily = aggregate_daily(&records, at(6, 0), &PricingTable::default(), &Utc);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, "2026-02-06");
    }

    #[test]
    fn test_local_date_follows_time_zone() {
        // 23:30 UTC on the 5th is already the 6th at UTC+2
        let ts = Utc.with_ymd_and_hms(2026, 2, 5, 23, 30, 0).unwrap();
        let records = deduplicate(vec![record(ts, None, "claude-sonnet-4", io(1, 1))]);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        let daily = aggregate_daily(&records, epoch(), &PricingTable::default(), &plus_two);
        assert_eq!(daily[0].date, "2026-02-06");
    }

    #[test]
    fn test_breakdowns_sorted_by_cost_and_sum_to_totals() {
        let cc = TokenCounts {
            input: 10,
            output: 20,
            cache_creation: 30,
            cache_read: 40,
        };
        let records = deduplicate(vec![
            record(at(5, 1), None, "claude-haiku-4-5", cc),
            record(at(5, 2), None, "claude-opus-4-1", cc),
            record(at(5, 3), None, "claude-sonnet-4", cc),
            record(at(5, 4), None, "claude-opus-4-1", cc),
        ]);
        let daily = aggregate_daily(&records, epoch(), &PricingTable::default(), &Utc);
        let day = &daily[0];

        let names: Vec<&str> = day
            .model_breakdowns
            .iter()
            .map(|b| b.model_name.as_str())
            .collect();
        assert_eq!(names, vec!["claude-opus-4-1", "claude-sonnet-4", "claude-haiku-4-5"]);
        assert_eq!(
            day.models_used,
            vec!["claude-haiku-4-5", "claude-opus-4-1", "claude-sonnet-4"]
        );

        let breakdown_tokens: u64 = day.model_breakdowns.iter().map(|b| b.total_tokens()).sum();
        let breakdown_cost: f64 = day.model_breakdowns.iter().map(|b| b.cost).sum();
        assert_eq!(day.total_tokens, breakdown_tokens);
        assert_eq!(
            day.total_tokens,
            day.input_tokens + day.output_tokens + day.cache_creation_tokens + day.cache_read_tokens
        );
        assert!((day.total_cost - breakdown_cost).abs() < 1e-12);
    }

    #[test]
    fn test_equal_cost_models_keep_encounter_order() {
        let records = deduplicate(vec![
            record(at(5, 1), None, "claude-sonnet-4", io(0, 0)),
            record(at(5, 2), None, "claude-haiku-3", io(0, 0)),
            record(at(5, 3), None, "claude-opus-4", io(0, 0)),
        ]);
        let daily = aggregate_daily(&records, epoch(), &PricingTable::default(), &Utc);
        let names: Vec<&str> = daily[0]
            .model_breakdowns
            .iter()
            .map(|b| b.model_name.as_str())
            .collect();
        assert_eq!(names, vec!["claude-sonnet-4", "claude-haiku-3", "claude-opus-4"]);
    }

    #[test]
    fn test_zero_token_model_keeps_zero_cost_entry() {
        let records = deduplicate(vec![record(at(5, 1), None, "claude-haiku-3", io(0, 0))]);
        let daily = aggregate_daily(&records, epoch(), &PricingTable::default(), &Utc);
        assert_eq!(daily[0].model_breakdowns.len(), 1);
        assert_eq!(daily[0].model_breakdowns[0].cost, 0.0);
        assert_eq!(daily[0].total_cost, 0.0);
    }

    #[test]
    fn test_unpriced_models_are_flagged() {
        let records = deduplicate(vec![
            record(at(5, 1), None, "mystery-model", io(1_000, 1_000)),
            record(at(5, 2), None, "claude-sonnet-4", io(1_000, 0)),
        ]);
        let pricing = PricingTable::new(UnknownModelPolicy::Unpriced);
        let daily = aggregate_daily(&records, epoch(), &pricing, &Utc);
        let mystery = daily[0]
            .model_breakdowns
            .iter()
            .find(|b| b.model_name == "mystery-model")
            .unwrap();
        assert!(mystery.unpriced);
        assert_eq!(mystery.cost, 0.0);
        assert!((daily[0].total_cost - 0.003).abs() < 1e-12);
    }
}
