// src/server/mod.rs

//! The composition root a host binary calls into: builds the core
//! services from configuration, spawns their background loops, and runs
//! until cancellation (spec §0/§5).

use crate::config::Config;
use anyhow::Result;
use tracing::info;

mod context;
mod initialization;
mod spawner;

pub use context::ServerContext;

/// Builds and runs the core's background services until `shutdown_tx`
/// fires or the process is interrupted.
pub async fn run(config: Config) -> Result<()> {
    let mut ctx = initialization::setup(config).await?;
    spawner::spawn_all(&mut ctx).await?;

    info!("syftbox-core running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = ctx.shutdown_tx.send(());

    while let Some(result) = ctx.background_tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("background task ended with error: {}", e),
            Err(e) => tracing::warn!("background task panicked: {}", e),
        }
    }

    Ok(())
}
