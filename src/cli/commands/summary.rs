use anyhow::Result;
use chrono::Local;
use colored::Colorize;

use crate::cli::SourceArgs;
use crate::config::load_config;
use crate::engine::UsageEngine;
use crate::usage::types::{LimitSource, LimitWindow, UsageSummary};

/// Run one refresh pass and print the result.
///
/// A failed pass falls back to the cached snapshot; only a failure with
/// nothing cached is an error.
pub async fn run(source: SourceArgs, json: bool) -> Result<()> {
    let mut config = load_config()?;
    source.apply(&mut config);
    let engine = UsageEngine::new(config)?;

    let summary = match engine.refresh().await {
        Ok(summary) => summary,
        Err(err) => match engine.current().await {
            Some(cached) => {
                eprintln!(
                    "{} refresh failed ({}); showing data from {}",
                    "warning:".yellow(),
                    err,
                    cached.last_updated.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
                cached
            }
            None => return Err(err.into()),
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&summary);
    }
    Ok(())
}

fn print_report(summary: &UsageSummary) {
    println!("\n{}", "  Claude Code Usage".bold().bright_yellow());
    println!("{}", "  ─────────────────────────────".dimmed());

    println!(
        "\n  {} ${:.2}   {} ${:.2}   {} ${:.2}",
        "Today".bold(),
        summary.today_cost,
        "7 days".bold(),
        summary.week_cost,
        "Month".bold(),
        summary.month_cost
    );

    if summary.today_model_breakdowns.is_empty() {
        println!("\n  {}", "No usage today".dimmed());
    } else {
        println!(
            "\n  {} {} tokens",
            "Today's models:".bold(),
            format_tokens(summary.today_tokens).bright_yellow()
        );
        for model in &summary.today_model_breakdowns {
            let cost = if model.unpriced {
                "unpriced".dimmed().to_string()
            } else {
                format!("${:.2}", model.cost)
            };
            println!(
                "    {:<32} {:>8}  {}",
                model.model_name,
                format_tokens(model.total_tokens()),
                cost
            );
        }
    }

    println!("\n  {}", "Rate limits:".bold());
    print_window("5-hour", &summary.rate_limits.session);
    print_window("7-day", &summary.rate_limits.weekly);
    if let Some(opus) = &summary.rate_limits.weekly_opus {
        println!("    {:<8} {}", "Opus", format_percent(opus.utilization));
    }

    println!(
        "\n  {}\n",
        format!(
            "Updated {}",
            summary.last_updated.with_timezone(&Local).format("%H:%M:%S")
        )
        .dimmed()
    );
}

fn print_window(label: &str, window: &LimitWindow) {
    let source = match window.source {
        LimitSource::Remote => "remote",
        LimitSource::LocalEstimate => "estimate",
        LimitSource::Empty => "no activity",
    };
    let reset = window
        .minutes_until_reset
        .map(|m| format!("resets in {}", format_reset(m)))
        .unwrap_or_default();

    println!(
        "    {:<8} {:>7}  {:<11} {} tokens  {}",
        label,
        format_percent(window.percent_used),
        source.dimmed(),
        format_tokens(window.local.tokens_used),
        reset
    );
}

/// Percentage colored by how close it is to the limit
pub fn format_percent(percent: f64) -> String {
    let text = format!("{percent:.1}%");
    if percent >= 90.0 {
        text.red().bold().to_string()
    } else if percent >= 70.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

/// Countdown as `Xm`, `Xh Ym` or `Xd Yh`
pub fn format_reset(minutes: u32) -> String {
    const HOUR: u32 = 60;
    const DAY: u32 = 24 * HOUR;

    if minutes < HOUR {
        format!("{minutes}m")
    } else if minutes < DAY {
        format!("{}h {}m", minutes / HOUR, minutes % HOUR)
    } else {
        format!("{}d {}h", minutes / DAY, (minutes % DAY) / HOUR)
    }
}

pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}
