use anyhow::Result;
use colored::Colorize;

use crate::config::{config_path, load_config, save_config, PlanTier};

/// Print the effective configuration as JSON
pub fn show() -> Result<()> {
    let config = load_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn path() -> Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

pub fn set_plan(tier: PlanTier) -> Result<()> {
    let mut config = load_config()?;
    config.plan.tier = tier;
    save_config(&config)?;

    let limits = config.plan.limits();
    println!(
        "{} plan set to {:?} (session {} tokens, weekly {} tokens)",
        "\u{2713}".green(),
        tier,
        limits.session_tokens,
        limits.weekly_tokens
    );
    Ok(())
}
