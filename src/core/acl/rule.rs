// src/core/acl/rule.rs

//! Rule, Access, and Limits data types (spec §3), plus the compiled,
//! interior representation a `Node` stores (spec §3's "Compiled Rule").

use super::pattern::Matcher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// The `EVERYONE` principal token: matches any requester.
pub const EVERYONE: &str = "*";
/// The `USER` principal token: resolved to the current requester at
/// evaluation time (spec §4.6 step 5).
pub const USER_TOKEN: &str = "USER";

/// Three sets of principals granting admin/write/read access (spec §3).
/// Each set holds literal ids and/or glob patterns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Access {
    #[serde(default)]
    pub admin: HashSet<String>,
    #[serde(default)]
    pub write: HashSet<String>,
    #[serde(default)]
    pub read: HashSet<String>,
}

impl Access {
    /// A convenience constructor matching the spec's `public-read-write`
    /// shorthand used throughout §8's scenarios: everyone may read and
    /// write, nobody but the owner (handled separately) administers.
    pub fn public_read_write() -> Self {
        Self {
            admin: HashSet::new(),
            write: [EVERYONE.to_string()].into_iter().collect(),
            read: [EVERYONE.to_string()].into_iter().collect(),
        }
    }

    pub fn public_read() -> Self {
        Self {
            admin: HashSet::new(),
            write: HashSet::new(),
            read: [EVERYONE.to_string()].into_iter().collect(),
        }
    }

    pub fn private() -> Self {
        Self::default()
    }

    /// Returns a shallow clone with the `USER` token removed from every
    /// set it appears in and the resolved `user_id` added in its place
    /// (spec §4.6 step 5).
    pub fn resolve_user_token(&self, user_id: &str) -> Access {
        let resolve = |set: &HashSet<String>| -> HashSet<String> {
            let mut out: HashSet<String> = set.iter().filter(|s| s.as_str() != USER_TOKEN).cloned().collect();
            if set.contains(USER_TOKEN) {
                out.insert(user_id.to_string());
            }
            out
        };
        Access {
            admin: resolve(&self.admin),
            write: resolve(&self.write),
            read: resolve(&self.read),
        }
    }

    /// Membership check per spec §4.6 step 5: `EVERYONE` grants
    /// unconditionally, an exact id match grants, otherwise entries
    /// containing glob metacharacters are matched against `user_id`.
    pub fn set_allows(set: &HashSet<String>, user_id: &str) -> bool {
        if set.contains(EVERYONE) {
            return true;
        }
        if set.contains(user_id) {
            return true;
        }
        set.iter()
            .filter(|entry| entry.contains(['*', '?', '[']))
            .any(|entry| {
                Matcher::compile(entry)
                    .map(|m| m.matches(user_id, user_id).unwrap_or(false))
                    .unwrap_or(false)
            })
    }
}

/// Size/kind limits attached to a rule (spec §3).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Limits {
    /// `0` means unbounded.
    #[serde(default)]
    pub max_file_size: i64,
    #[serde(default)]
    pub allow_dirs: bool,
    #[serde(default)]
    pub allow_symlinks: bool,
}

/// File descriptor carried on a request, not on the path (spec §3).
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDescriptor {
    pub size: i64,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// A single rule: a pattern plus its access sets and limits (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub limits: Limits,
}

/// The compiled, interior representation of a `Rule` once it has been
/// inserted into a `Node`: its full path-qualified pattern, a compiled
/// matcher, and a back-reference to the owning node's path.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub full_pattern: String,
    pub rule: Arc<Rule>,
    pub matcher: Arc<Matcher>,
    pub owning_node_path: String,
    /// The owning node's version at the moment this rule was compiled;
    /// used by the cache to detect staleness (spec §4.5).
    pub node_version: u16,
    pub specificity: i64,
}

impl CompiledRule {
    pub fn owner(&self) -> &str {
        self.owning_node_path.split('/').next().unwrap_or("")
    }
}
