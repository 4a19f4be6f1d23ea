// src/core/datasite/subdomain.rs

//! Bidirectional email/hash mapping and the vanity-domain table (spec
//! §4.11), both under a single `RwLock`, following the teacher's
//! single-lock-over-related-tables approach in `core::storage::db::shard`.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

/// Number of leading hex characters of the SHA-256 digest kept as the
/// subdomain hash (spec §3).
const HASH_LEN: usize = 16;

/// A vanity domain's target: the owning email and the sub-path it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanityTarget {
    pub email: String,
    pub path: String,
}

struct Tables {
    hash_to_email: HashMap<String, String>,
    email_to_hash: HashMap<String, String>,
    vanity: HashMap<String, VanityTarget>,
}

/// Computes the subdomain hash for `email`: the first 16 lowercase hex
/// characters of SHA-256 over the lowercased, trimmed email (spec §3).
pub fn subdomain_hash(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)[..HASH_LEN].to_string()
}

/// The subdomain/vanity-domain mapping owned by the datasite coordinator
/// (spec §4.11). All reads return defensive copies.
pub struct SubdomainMapping {
    tables: RwLock<Tables>,
}

impl Default for SubdomainMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl SubdomainMapping {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                hash_to_email: HashMap::new(),
                email_to_hash: HashMap::new(),
                vanity: HashMap::new(),
            }),
        }
    }

    /// Adds (or confirms) the hash mapping for `email`. Idempotent: calling
    /// twice with the same email returns the same hash and does not
    /// duplicate state.
    pub fn add_mapping(&self, email: &str) -> String {
        let hash = subdomain_hash(email);
        let mut tables = self.tables.write().unwrap();
        tables.email_to_hash.insert(email.to_string(), hash.clone());
        tables.hash_to_email.insert(hash.clone(), email.to_string());
        hash
    }

    pub fn get_email_by_hash(&self, hash: &str) -> Option<String> {
        self.tables.read().unwrap().hash_to_email.get(hash).cloned()
    }

    pub fn get_hash_by_email(&self, email: &str) -> Option<String> {
        self.tables.read().unwrap().email_to_hash.get(email).cloned()
    }

    /// Adds (overwriting any existing entry for) a vanity domain.
    pub fn add_vanity_domain(&self, domain: &str, email: &str, path: &str) {
        self.tables.write().unwrap().vanity.insert(
            domain.to_string(),
            VanityTarget {
                email: email.to_string(),
                path: path.to_string(),
            },
        );
    }

    pub fn get_vanity_domain(&self, domain: &str) -> Option<VanityTarget> {
        self.tables.read().unwrap().vanity.get(domain).cloned()
    }

    /// Removes every vanity entry whose target email equals `email`.
    pub fn clear_vanity_domains(&self, email: &str) {
        self.tables
            .write()
            .unwrap()
            .vanity
            .retain(|_, target| target.email != email);
    }

    pub fn known_owners(&self) -> Vec<String> {
        self.tables.read().unwrap().email_to_hash.keys().cloned().collect()
    }
}
