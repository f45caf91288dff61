//! JSON HTTP surface over the usage engine

pub mod dto;
pub mod handlers;
pub mod router;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::engine::UsageEngine;
use handlers::AppState;

/// Bind to localhost and serve until the process is stopped
pub async fn serve(engine: Arc<UsageEngine>, port: u16) -> Result<()> {
    let app = router::create_router(Arc::new(AppState { engine }));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
