// src/server/spawner.rs

//! Spawns the core's long-running background tasks: the blob indexer
//! (via `BlobService::start`), the hub's run loop, and the datasite
//! coordinator's blob-change subscription.

use super::context::ServerContext;
use anyhow::Result;
use tracing::info;

/// Spawns all background tasks into the context's `JoinSet`.
pub async fn spawn_all(ctx: &mut ServerContext) -> Result<()> {
    let shutdown_tx = ctx.shutdown_tx.clone();

    // --- Blob indexer + post-write hooks ---
    let indexer_shutdown = shutdown_tx.subscribe();
    let indexer_handle = ctx.blob.start(ctx.hooks_backend.as_ref(), indexer_shutdown);
    ctx.background_tasks.spawn(async move {
        indexer_handle.await?;
        Ok(())
    });

    // --- Datasite coordinator reacts to blob changes ---
    let coordinator = ctx.coordinator.clone();
    let blob = ctx.blob.clone();
    ctx.blob.on_blob_change(move |event| {
        let coordinator = coordinator.clone();
        let blob = blob.clone();
        Box::pin(async move {
            let fetch_blob = blob.clone();
            coordinator
                .on_blob_change(&event, move |key| {
                    let fetch_blob = fetch_blob.clone();
                    async move { fetch_blob.get_object(&key).await.map(|bytes| bytes.to_vec()) }
                })
                .await;
        })
    });

    // --- Hub run loop ---
    let hub = ctx.hub.clone();
    let hub_shutdown = shutdown_tx.subscribe();
    ctx.background_tasks.spawn(async move {
        hub.run(hub_shutdown).await;
        Ok(())
    });

    info!("all background tasks have been spawned");
    Ok(())
}
