// src/server/initialization.rs

//! Constructs the ACL engine, object store façade, datasite coordinator,
//! and hub from configuration, before any background task is spawned.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::acl::AclService;
use crate::core::blob::{BlobBackend, BlobIndex, BlobIndexConfig, BlobService, HasHooks, MemoryBackend, S3Backend, S3Config};
use crate::core::datasite::{DatasiteCoordinator, SubdomainMapping};
use crate::core::errors::CoreResult;
use crate::core::hub::{Hub, HotlinkRegistry};
use crate::core::pipeline::Pipeline;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all core services before starting any background loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let acl = Arc::new(AclService::new());

    let (backend, hooks_backend): (Arc<dyn BlobBackend>, Arc<dyn HasHooks>) = if config.blob.bucket.is_empty() {
        info!("blob.bucket is empty; using the in-memory blob backend");
        let memory = Arc::new(MemoryBackend::new());
        (memory.clone(), memory)
    } else {
        let s3 = Arc::new(S3Backend::new(&S3Config {
            bucket: config.blob.bucket.clone(),
            region: config.blob.region.clone(),
            endpoint: config.blob.endpoint.clone(),
            access_key: config.blob.access_key.clone(),
            secret_key: config.blob.secret_key.clone(),
            use_accelerate: config.blob.use_accelerate,
        })?);
        (s3.clone(), s3)
    };

    let index_path = format!("{}/blob_index.sqlite3", config.data_dir.trim_end_matches('/'));
    let blob_index = Arc::new(
        BlobIndex::connect(&BlobIndexConfig {
            database_url: format!("sqlite://{index_path}?mode=rwc"),
            max_connections: 10,
        })
        .await?,
    );

    let blob = Arc::new(BlobService::new(
        backend,
        blob_index.clone(),
        Duration::from_secs(config.indexer.interval_secs),
    ));

    let hub = Arc::new(Hub::new(config.hub.inbound_buffer));
    let hotlinks = Arc::new(HotlinkRegistry::new());
    let subdomains = Arc::new(SubdomainMapping::new());
    let coordinator = Arc::new(DatasiteCoordinator::new(subdomains.clone(), config.http.domain.clone()));
    let pipeline = Pipeline::new(acl.clone(), blob.clone(), hub.clone(), hotlinks.clone());

    bootstrap_datasites(&coordinator, &blob, &blob_index).await?;

    info!("syftbox-core services initialized");

    Ok(ServerContext {
        config,
        acl,
        blob,
        blob_index,
        hooks_backend,
        hub,
        subdomains,
        coordinator,
        pipeline,
        hotlinks,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Fetches each owner's `settings.yaml` through the blob service so the
/// coordinator can seed its vanity-domain table (spec §4.12 steps 1-3).
async fn bootstrap_datasites(coordinator: &DatasiteCoordinator, blob: &Arc<BlobService>, index: &Arc<BlobIndex>) -> CoreResult<()> {
    let blob = blob.clone();
    coordinator
        .bootstrap(index, move |key| {
            let blob = blob.clone();
            async move { blob.get_object(&key).await.map(|bytes| bytes.to_vec()) }
        })
        .await
}

fn log_startup_info(config: &Config) {
    info!(
        data_dir = %config.data_dir,
        main_domain = %config.http.domain,
        indexer_interval_secs = config.indexer.interval_secs,
        "starting syftbox-core"
    );
    if config.blob.bucket.is_empty() {
        tracing::warn!("no blob.bucket configured; object storage will not persist across restarts");
    }
}
