// src/core/acl/cache.rs

//! A concurrent path→compiled-rule cache, invalidated by path prefix when
//! rulesets change (spec §4.5). Entries are validated against the owning
//! node's current version on read; mismatched entries are evicted and
//! recomputed by the caller.

use super::rule::CompiledRule;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
struct CacheEntry {
    rule: Arc<CompiledRule>,
}

/// Path→compiled-rule cache. Grounded on the teacher's
/// `core::pubsub::PubSubManager`'s `DashMap`-backed entry API.
#[derive(Default)]
pub struct AclCache {
    entries: DashMap<String, CacheEntry>,
}

impl AclCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached compiled rule for `path` only if its stored
    /// node version still equals the owning node's current version,
    /// evicting the stale entry otherwise.
    pub fn get(&self, path: &str, current_node_version: u16) -> Option<Arc<CompiledRule>> {
        let stale = match self.entries.get(path) {
            Some(entry) if entry.rule.node_version == current_node_version => {
                return Some(entry.rule.clone());
            }
            Some(_) => true,
            None => false,
        };
        if stale {
            self.entries.remove(path);
        }
        None
    }

    pub fn set(&self, path: String, rule: Arc<CompiledRule>) {
        self.entries.insert(path, CacheEntry { rule });
    }

    /// Removes every entry whose key begins with `prefix`, returning the
    /// count removed.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acl::pattern::Matcher;
    use crate::core::acl::rule::{Access, Rule};

    fn dummy_rule(node_version: u16) -> Arc<CompiledRule> {
        Arc::new(CompiledRule {
            full_pattern: "u@e.com/*".into(),
            rule: Arc::new(Rule {
                pattern: "*".into(),
                access: Access::public_read_write(),
                limits: Default::default(),
            }),
            matcher: Arc::new(Matcher::compile("*").unwrap()),
            owning_node_path: "u@e.com".into(),
            node_version,
            specificity: 0,
        })
    }

    #[test]
    fn hit_requires_matching_version() {
        let cache = AclCache::new();
        cache.set("u@e.com/file.txt".into(), dummy_rule(1));
        assert!(cache.get("u@e.com/file.txt", 1).is_some());
        assert!(cache.get("u@e.com/file.txt", 2).is_none());
        // Stale entry has been evicted.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn delete_prefix_removes_matching_keys() {
        let cache = AclCache::new();
        cache.set("u@e.com/a".into(), dummy_rule(1));
        cache.set("u@e.com/b".into(), dummy_rule(1));
        cache.set("other@e.com/a".into(), dummy_rule(1));
        assert_eq!(cache.delete_prefix("u@e.com"), 2);
        assert_eq!(cache.len(), 1);
    }
}
