use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::SummaryCache;
use crate::config::Config;
use crate::error::EngineError;
use crate::legacy::LegacyProvider;
use crate::remote::api::UsageApiClient;
use crate::remote::credentials::ClaudeCredentials;
use crate::remote::types::UtilizationSnapshot;
use crate::usage::aggregator::aggregate_daily;
use crate::usage::dedup::deduplicate;
use crate::usage::merge::{merge_rate_limits, PlanLimits, SourceResult};
use crate::usage::parser::parse_line;
use crate::usage::pricing::PricingTable;
use crate::usage::scanner::LogScanner;
use crate::usage::summary::build_summary;
use crate::usage::types::{DailyUsage, RateLimitInfo, UsageSummary};
use crate::usage::windows::{build_rate_limits, WEEKLY_WINDOW_HOURS};

/// Output of one pass over the local logs
#[derive(Debug, Clone)]
pub struct LocalUsage {
    pub daily: Vec<DailyUsage>,
    pub windows: RateLimitInfo,
}

/// The blocking half of a refresh: scan, parse, dedup, aggregate.
#[derive(Debug, Clone)]
pub struct LocalPipeline {
    scanner: LogScanner,
    pricing: PricingTable,
    lookback_days: u32,
    legacy: Option<LegacyProvider>,
}

impl LocalPipeline {
    pub fn new(
        scanner: LogScanner,
        pricing: PricingTable,
        lookback_days: u32,
        legacy: Option<LegacyProvider>,
    ) -> Self {
        Self {
            scanner,
            pricing,
            lookback_days,
            legacy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let scanner = LogScanner::new(config.logs.expanded_roots(), config.logs.extension.clone());
        let legacy = config
            .legacy
            .enabled
            .then(|| LegacyProvider::new(config.legacy.binary.clone()));
        Self::new(
            scanner,
            PricingTable::new(config.pricing.unknown_models),
            config.logs.lookback_days,
            legacy,
        )
    }

    /// Run one pass. Only fails when the legacy binary was the daily source,
    /// it failed, and there are no logs to fall back to.
    pub fn run(&self, now: DateTime<Utc>) -> Result<LocalUsage, EngineError> {
        let since = now - Duration::days(i64::from(self.lookback_days));
        // The weekly window needs a full week even with a short lookback
        let scan_from = since.min(now - Duration::hours(i64::from(WEEKLY_WINDOW_HOURS)));

        let records = deduplicate(self.scanner.lines(scan_from).filter_map(|line| parse_line(&line)));
        if records.is_empty() {
            debug!("no usage records under {:?}", self.scanner.roots());
        } else {
            debug!("{} usage records after dedup", records.len());
        }

        let windows = build_rate_limits(&records, now);

        let daily = match &self.legacy {
            Some(legacy) => {
                let until = now.with_timezone(&Local).date_naive();
                let from = since.with_timezone(&Local).date_naive();
                match legacy.fetch_daily(from, until) {
                    Ok(daily) => daily,
                    Err(err) if self.scanner.any_root_exists() => {
                        warn!("{err}; falling back to session logs");
                        aggregate_daily(&records, since, &self.pricing, &Local)
                    }
                    Err(err) => return Err(EngineError::AllSourcesFailed(err.to_string())),
                }
            }
            None => aggregate_daily(&records, since, &self.pricing, &Local),
        };

        Ok(LocalUsage { daily, windows })
    }
}

/// Owns the last good summary and runs refresh passes.
///
/// The snapshot is only ever replaced whole, after a pass succeeds. Overlapping
/// `refresh` calls are coalesced: a caller that arrives while a pass is running
/// waits for it and shares its outcome.
pub struct UsageEngine {
    config: Config,
    pipeline: LocalPipeline,
    plan_limits: PlanLimits,
    remote: Option<UsageApiClient>,
    cache: Option<SummaryCache>,
    snapshot: RwLock<Option<UsageSummary>>,
    /// Outcome of the most recent pass, held while a pass runs
    refresh_lock: Mutex<Option<Result<UsageSummary, String>>>,
    completed_passes: AtomicU64,
}

impl UsageEngine {
    pub fn new(config: Config) -> Result<Self> {
        let remote = if config.remote.enabled {
            Some(UsageApiClient::new(
                config.remote.endpoint.clone(),
                StdDuration::from_secs(config.remote.timeout_secs),
                Arc::new(ClaudeCredentials::new()),
            )?)
        } else {
            None
        };
        Ok(Self::from_parts(config, remote, SummaryCache::default_location()))
    }

    pub fn from_parts(
        config: Config,
        remote: Option<UsageApiClient>,
        cache: Option<SummaryCache>,
    ) -> Self {
        let seeded = cache.as_ref().and_then(SummaryCache::load);
        if seeded.is_some() {
            debug!("seeded snapshot from summary cache");
        }

        Self {
            pipeline: LocalPipeline::from_config(&config),
            plan_limits: config.plan.limits(),
            config,
            remote,
            cache,
            snapshot: RwLock::new(seeded),
            refresh_lock: Mutex::new(None),
            completed_passes: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Last good summary, possibly from a previous run
    pub async fn current(&self) -> Option<UsageSummary> {
        self.snapshot.read().await.clone()
    }

    /// Run a refresh pass, or join the one already in flight.
    pub async fn refresh(&self) -> Result<UsageSummary, EngineError> {
        let observed = self.completed_passes.load(Ordering::Acquire);
        let mut last = self.refresh_lock.lock().await;

        if self.completed_passes.load(Ordering::Acquire) != observed {
            if let Some(outcome) = last.as_ref() {
                debug!("refresh coalesced with a pass that just finished");
                return outcome.clone().map_err(EngineError::Coalesced);
            }
        }

        let outcome = self.run_pass().await;
        *last = Some(match &outcome {
            Ok(summary) => Ok(summary.clone()),
            Err(err) => Err(err.to_string()),
        });
        self.completed_passes.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn run_pass(&self) -> Result<UsageSummary, EngineError> {
        let now = Utc::now();
        let pipeline = self.pipeline.clone();

        let (local, remote) = tokio::join!(
            tokio::task::spawn_blocking(move || pipeline.run(now)),
            self.fetch_remote()
        );
        let local = local??;
        if !remote.is_available() {
            debug!("using local estimates for rate limits");
        }

        let rate_limits = merge_rate_limits(local.windows, &remote, self.plan_limits, now);
        let today = now.with_timezone(&Local).date_naive();
        let summary = build_summary(local.daily, rate_limits, today, now);

        *self.snapshot.write().await = Some(summary.clone());
        info!(
            "usage refreshed: today ${:.2}, session {:.1}%",
            summary.today_cost, summary.rate_limits.session.percent_used
        );

        if let Some(cache) = self.cache.clone() {
            let snapshot = summary.clone();
            let saved = tokio::task::spawn_blocking(move || {
                cache.save(&snapshot).map_err(|err| {
                    format!("failed to persist summary cache to {}: {err:#}", cache.path().display())
                })
            })
            .await;
            match saved {
                Ok(Ok(())) => {}
                Ok(Err(msg)) => warn!("{msg}"),
                Err(err) => warn!("summary cache task failed: {err}"),
            }
        }

        Ok(summary)
    }

    async fn fetch_remote(&self) -> SourceResult<UtilizationSnapshot> {
        match &self.remote {
            Some(client) => client.fetch().await,
            None => SourceResult::Unavailable("remote disabled".to_string()),
        }
    }

    /// Refresh forever on a fixed interval. Failures are logged and the
    /// previous snapshot is kept.
    pub async fn run_periodic(self: Arc<Self>, interval: StdDuration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.refresh().await {
                warn!("refresh failed: {err}");
            }
        }
    }
}
