// src/core/datasite/mod.rs

//! Subdomain/vanity-domain mapping and the coordinator that keeps it in
//! sync with the blob key-space (spec §4.11/§4.12).

pub mod coordinator;
pub mod settings;
pub mod subdomain;

pub use coordinator::DatasiteCoordinator;
pub use settings::{expand_domains, is_domain_allowed, parse_settings, Settings};
pub use subdomain::{subdomain_hash, SubdomainMapping, VanityTarget};
