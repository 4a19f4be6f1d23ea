// src/core/datasite/coordinator.rs

//! Initializes subdomain mappings from existing datasites and reacts to
//! blob-change events to keep vanity-domain configs current (spec §4.12).

use super::settings::{expand_domains, is_domain_allowed, parse_settings};
use super::subdomain::SubdomainMapping;
use crate::core::acl::ACL_FILE_NAME;
use crate::core::blob::{BlobChangeEvent, BlobIndex, ChangeKind};
use crate::core::errors::CoreResult;
use crate::core::path;
use std::sync::Arc;
use tracing::{debug, warn};

const SETTINGS_FILE_NAME: &str = "settings.yaml";
const DEFAULT_PUBLIC_PATH: &str = "/public";

/// Reacts to blob changes to keep subdomain and vanity-domain mappings
/// current (spec §4.12). Owns no backend of its own: it reads through the
/// index and a handle to the blob service for settings-file bodies.
pub struct DatasiteCoordinator {
    mapping: Arc<SubdomainMapping>,
    main_domain: String,
}

impl DatasiteCoordinator {
    pub fn new(mapping: Arc<SubdomainMapping>, main_domain: impl Into<String>) -> Self {
        Self {
            mapping,
            main_domain: main_domain.into(),
        }
    }

    pub fn mapping(&self) -> &Arc<SubdomainMapping> {
        &self.mapping
    }

    /// Enumerates ACL-file blobs, registers each distinct owner, and loads
    /// any `settings.yaml` vanity domains already present (spec §4.12
    /// step 1-3). `fetch` retrieves an object's body by key; callers pass
    /// a closure bound to the blob service so this module stays free of
    /// a `BlobBackend` dependency.
    pub async fn bootstrap<F, Fut>(&self, index: &BlobIndex, fetch: F) -> CoreResult<()>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = CoreResult<Vec<u8>>>,
    {
        let acl_blobs = index.filter_by_suffix(ACL_FILE_NAME).await?;
        let mut owners: Vec<String> = acl_blobs
            .iter()
            .filter_map(|blob| path::owner_segment(&blob.key).map(str::to_string))
            .collect();
        owners.sort();
        owners.dedup();

        for owner in owners {
            self.register_owner(&owner, &fetch).await;
        }
        Ok(())
    }

    async fn register_owner<F, Fut>(&self, owner: &str, fetch: &F)
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = CoreResult<Vec<u8>>>,
    {
        let hash = self.mapping.add_mapping(owner);
        self.mapping.add_vanity_domain(
            &format!("{hash}.{}", self.main_domain),
            owner,
            DEFAULT_PUBLIC_PATH,
        );
        self.load_vanity_domains(owner, &hash, fetch).await;
    }

    async fn load_vanity_domains<F, Fut>(&self, owner: &str, hash: &str, fetch: &F)
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = CoreResult<Vec<u8>>>,
    {
        let settings_key = path::join(owner, SETTINGS_FILE_NAME);
        let body = match fetch(settings_key).await {
            Ok(body) => body,
            Err(_) => return,
        };
        let body = match String::from_utf8(body) {
            Ok(body) => body,
            Err(_) => return,
        };
        let Some(settings) = parse_settings(&body) else {
            return;
        };
        for (domain, sub_path) in expand_domains(&settings, hash, &self.main_domain) {
            if is_domain_allowed(&domain, hash, &self.main_domain) {
                self.mapping.add_vanity_domain(&domain, owner, &sub_path);
            } else {
                warn!(domain = %domain, owner = %owner, "vanity domain claim refused");
            }
        }
    }

    /// Reacts to a blob-change event, reloading the owner's vanity-domain
    /// set when the event touches an ACL file or a `settings.yaml` (spec
    /// §4.12 "Blob-change reaction").
    pub async fn on_blob_change<F, Fut>(&self, event: &BlobChangeEvent, fetch: F)
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = CoreResult<Vec<u8>>>,
    {
        if !matches!(event.kind, ChangeKind::Put | ChangeKind::Delete) {
            return;
        }
        if !is_relevant_key(&event.key) {
            return;
        }
        let Some(owner) = path::owner_segment(&event.key) else {
            return;
        };
        let owner = owner.to_string();

        let hash = self
            .mapping
            .get_hash_by_email(&owner)
            .unwrap_or_else(|| self.mapping.add_mapping(&owner));

        self.mapping.clear_vanity_domains(&owner);
        self.mapping
            .add_vanity_domain(&format!("{hash}.{}", self.main_domain), &owner, DEFAULT_PUBLIC_PATH);
        self.load_vanity_domains(&owner, &hash, &fetch).await;

        debug!(owner = %owner, key = %event.key, "datasite vanity domains reloaded");
    }
}

fn is_relevant_key(key: &str) -> bool {
    key.ends_with(ACL_FILE_NAME) || key.ends_with(SETTINGS_FILE_NAME)
}
