// src/server/context.rs

//! Holds all the initialized state required to run the core's background
//! services to completion or cancellation.

use crate::config::Config;
use crate::core::acl::AclService;
use crate::core::blob::{BlobIndex, BlobService, HasHooks};
use crate::core::datasite::{DatasiteCoordinator, SubdomainMapping};
use crate::core::hub::{Hub, HotlinkRegistry};
use crate::core::pipeline::Pipeline;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// The composed core services plus the background-task bookkeeping a
/// host binary needs to run and shut them down (spec §4.10/§4.13/§5).
pub struct ServerContext {
    pub config: Config,
    pub acl: Arc<AclService>,
    pub blob: Arc<BlobService>,
    pub blob_index: Arc<BlobIndex>,
    pub hooks_backend: Arc<dyn HasHooks>,
    pub hub: Arc<Hub>,
    pub subdomains: Arc<SubdomainMapping>,
    pub coordinator: Arc<DatasiteCoordinator>,
    pub pipeline: Arc<Pipeline>,
    pub hotlinks: Arc<HotlinkRegistry>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}
