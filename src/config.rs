// src/config.rs

//! The fixed configuration shape the core consumes from its host (spec
//! §6/§9): `{data_dir, http{...}, blob{...}, acl{...}, indexer{...},
//! hub{...}}`. Loaded with the `config` crate layered over a TOML file,
//! mirroring the teacher's `Config::from_file`. Unrecognized sections
//! (`auth`, `email`, TLS cert/key paths) are accepted by the host's copy
//! of this same file and simply ignored here, since they belong to the
//! external HTTP/auth surface (spec §1/§9 non-goals).

use crate::core::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_main_domain() -> String {
    "syftbox.net".to_string()
}

fn default_blob_region() -> String {
    "us-east-1".to_string()
}

fn default_acl_file_name() -> String {
    "syft.pub.yaml".to_string()
}

/// Indexer default interval: 15 minutes (spec §4.9/§6).
fn default_indexer_interval_secs() -> u64 {
    15 * 60
}

fn default_hub_send_queue_capacity() -> usize {
    64
}

fn default_hub_inbound_buffer() -> usize {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
    pub cert: String,
    pub key: String,
    pub domain: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: default_http_addr(),
            cert: String::new(),
            key: String::new(),
            domain: default_main_domain(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub use_accelerate: bool,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_blob_region(),
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            use_accelerate: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    pub acl_file_name: String,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self { acl_file_name: default_acl_file_name() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub interval_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { interval_secs: default_indexer_interval_secs() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub send_queue_capacity: usize,
    pub inbound_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_queue_capacity: default_hub_send_queue_capacity(),
            inbound_buffer: default_hub_inbound_buffer(),
        }
    }
}

/// The configuration shape consumed by the core (spec §6/§9). A host
/// serves a single file containing this plus whatever sections its own
/// HTTP/auth/email layers need; only the fields below are read here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub acl: AclConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            http: HttpConfig::default(),
            blob: BlobConfig::default(),
            acl: AclConfig::default(),
            indexer: IndexerConfig::default(),
            hub: HubConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, layering environment
    /// overrides of the form `SYFTBOX__SECTION__FIELD` on top (the
    /// `config` crate's standard separator-based override convention).
    pub fn from_file(path: &str) -> CoreResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SYFTBOX").separator("__"))
            .build()
            .map_err(|e| CoreError::Internal(format!("failed to load configuration: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| CoreError::Internal(format!("failed to parse configuration: {e}")))
    }
}
