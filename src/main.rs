mod cache;
mod cli;
mod config;
mod engine;
mod error;
mod legacy;
mod remote;
mod server;
mod usage;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cli::SourceArgs;
use config::PlanTier;

#[derive(Parser)]
#[command(name = "tokenmeter")]
#[command(about = "Cost, token and rate-limit tracking for Claude Code session logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh once and print a usage summary
    Summary {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Refresh on an interval, printing a status line each time
    Watch {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Serve usage as JSON over HTTP
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Set the plan tier used for local estimates
    SetPlan {
        #[arg(value_enum)]
        tier: PlanTier,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tokenmeter=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { json, source } => cli::commands::summary::run(source, json).await,
        Commands::Watch { source } => cli::commands::watch::run(source).await,
        Commands::Serve { port, source } => cli::commands::serve::run(source, port).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::commands::config::show(),
            ConfigAction::Path => cli::commands::config::path(),
            ConfigAction::SetPlan { tier } => cli::commands::config::set_plan(tier),
        },
    }
}
