use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use colored::Colorize;

use super::summary::{format_percent, format_reset};
use crate::cli::SourceArgs;
use crate::config::load_config;
use crate::engine::UsageEngine;
use crate::usage::types::UsageSummary;

/// Refresh on the configured interval, printing one status line per pass
pub async fn run(source: SourceArgs) -> Result<()> {
    let mut config = load_config()?;
    source.apply(&mut config);

    let interval = Duration::from_secs(config.refresh.interval_secs.max(1));
    let engine = UsageEngine::new(config)?;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.refresh().await {
                    Ok(summary) => println!("{}", status_line(&summary)),
                    Err(e) => eprintln!("{} {}", "refresh failed:".red(), e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn status_line(summary: &UsageSummary) -> String {
    let session = &summary.rate_limits.session;
    let weekly = &summary.rate_limits.weekly;
    let reset = session
        .minutes_until_reset
        .map(|m| format!(" (resets in {})", format_reset(m)))
        .unwrap_or_default();

    format!(
        "{} today ${:.2} | session {}{} | week {}",
        summary.last_updated.with_timezone(&Local).format("%H:%M").to_string().dimmed(),
        summary.today_cost,
        format_percent(session.percent_used),
        reset,
        format_percent(weekly.percent_used),
    )
}
