use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cli::SourceArgs;
use crate::config::load_config;
use crate::engine::UsageEngine;
use crate::server;

/// Serve the JSON API while refreshing in the background
pub async fn run(source: SourceArgs, port: Option<u16>) -> Result<()> {
    let mut config = load_config()?;
    source.apply(&mut config);

    let port = port.unwrap_or(config.server.port);
    let interval = Duration::from_secs(config.refresh.interval_secs.max(1));
    let engine = Arc::new(UsageEngine::new(config)?);

    tokio::spawn(Arc::clone(&engine).run_periodic(interval));
    server::serve(engine, port).await
}
