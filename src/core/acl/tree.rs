// src/core/acl/tree.rs

//! Owns the ACL tree's root node; inserts, removes, and looks up the
//! nearest rule-bearing ancestor (spec §4.4).

use super::node::{self, Node};
use super::rule::{CompiledRule, Rule};
use crate::core::errors::{CoreError, CoreResult};
use crate::core::path;
use std::sync::Arc;

const MAX_DEPTH: u8 = 255;

/// The input unit from an ACL file: a collection of rules bound to an
/// owner-prefixed directory path, with a terminal flag (spec §3).
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub path: String,
    pub terminal: bool,
    pub rules: Vec<Rule>,
}

/// A single request to evaluate against the tree.
#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub user: String,
}

pub struct Tree {
    root: Arc<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            root: Node::new_root(),
        }
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    /// Inserts a ruleset. Rejects rulesets whose path depth exceeds 255 or
    /// whose owner segment is empty, and rejects insertion beneath a
    /// terminal node (spec §4.4).
    pub fn insert_ruleset(&self, ruleset: RuleSet) -> CoreResult<()> {
        let normalized = path::normalize(&ruleset.path);
        let segments = path::segments(&normalized);

        if segments.is_empty() || segments[0].is_empty() {
            return Err(CoreError::InvalidRuleset(
                "ruleset path must start with a non-empty owner segment".into(),
            ));
        }
        if segments.len() as u64 > MAX_DEPTH as u64 {
            return Err(CoreError::MaxDepthExceeded);
        }
        if ruleset.rules.is_empty() {
            return Err(CoreError::InvalidRuleset(
                "ruleset must contain at least one rule".into(),
            ));
        }

        let owner = segments[0];
        node::insert_along(&self.root, owner, &segments, ruleset.rules, ruleset.terminal)
            .map(|_| ())
            .map_err(|e| CoreError::InvalidRuleset(e.to_string()))
    }

    /// Removes the ruleset rooted at `path`, detaching the node if it has
    /// no remaining children (spec §4.4).
    pub fn remove_ruleset(&self, path: &str) -> bool {
        let normalized = path::normalize(path);
        let segments = path::segments(&normalized);
        node::remove_along(&self.root, &segments)
    }

    /// Walks from the root along `path`'s segments, returning the nearest
    /// rule-bearing ancestor, respecting terminal boundaries (spec §4.4).
    pub fn nearest(&self, normalized_path: &str) -> Option<Arc<Node>> {
        let segments = path::segments(normalized_path);

        let mut candidate = None;
        let mut node = self.root.clone();
        if node.has_rules() {
            candidate = Some(node.clone());
        }
        if node.is_terminal() {
            return candidate;
        }

        for seg in segments {
            match node.child(seg) {
                Some(child) => {
                    node = child;
                    if node.has_rules() {
                        candidate = Some(node.clone());
                    }
                    if node.is_terminal() {
                        return candidate;
                    }
                }
                None => return candidate,
            }
        }
        candidate
    }

    /// Resolves the effective compiled rule for `request`: finds the
    /// nearest rule-bearing ancestor, scans its rules in specificity
    /// order, and returns the first whose matcher accepts
    /// `(request.path, request.user)`. The returned rule's access sets
    /// still carry the raw `USER` token; resolving it against the
    /// requester is the caller's job (spec §4.6 step 5), since the
    /// compiled rule is cached per-path and must stay requester-agnostic.
    pub fn resolve(&self, request: &Request) -> CoreResult<CompiledRule> {
        let normalized = path::normalize(&request.path);
        let node = self.nearest(&normalized).ok_or(CoreError::NoRule)?;

        for rule in node.rules_snapshot() {
            // A rule's pattern is relative to its owning node; the matcher
            // is compiled against the node-qualified full pattern so it
            // can be checked against the request's absolute path.
            let full_pattern = path::join(&node.path, &rule.pattern);
            let matcher = super::pattern::Matcher::compile(&full_pattern)
                .map_err(CoreError::InvalidRuleset)?;
            if matcher
                .matches(&normalized, &request.user)
                .map_err(CoreError::InvalidRuleset)?
            {
                return Ok(CompiledRule {
                    full_pattern,
                    rule: rule.clone(),
                    matcher: Arc::new(matcher),
                    owning_node_path: node.path.clone(),
                    node_version: node.version(),
                    specificity: super::specificity::score(&rule.pattern),
                });
            }
        }
        Err(CoreError::NoRule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acl::rule::Access;

    fn ruleset(owner_path: &str, terminal: bool, patterns: &[&str]) -> RuleSet {
        RuleSet {
            path: owner_path.to_string(),
            terminal,
            rules: patterns
                .iter()
                .map(|p| Rule {
                    pattern: p.to_string(),
                    access: Access::public_read_write(),
                    limits: Default::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn rejects_empty_owner() {
        let tree = Tree::new();
        let err = tree.insert_ruleset(ruleset("", false, &["*"])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRuleset(_)));
    }

    #[test]
    fn rejects_depth_over_255() {
        let tree = Tree::new();
        let deep_path = (0..260)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("/");
        let err = tree.insert_ruleset(ruleset(&deep_path, false, &["*"])).unwrap_err();
        assert!(matches!(err, CoreError::MaxDepthExceeded));
    }

    #[test]
    fn nearest_respects_terminal_boundary() {
        let tree = Tree::new();
        tree.insert_ruleset(ruleset("u@e.com", true, &["*.md"])).unwrap();
        // No rules recorded beneath the terminal node; none should be
        // reachable even though nothing was literally inserted there.
        let nearest = tree.nearest("u@e.com/sub/deep.md");
        assert!(nearest.is_some());
        assert_eq!(nearest.unwrap().path, "u@e.com");
    }

    #[test]
    fn round_trip_insert_then_remove_restores_lookup() {
        let tree = Tree::new();
        assert!(tree.nearest("u@e.com/x").is_none());
        tree.insert_ruleset(ruleset("u@e.com", false, &["*"])).unwrap();
        assert!(tree.nearest("u@e.com/x").is_some());
        assert!(tree.remove_ruleset("u@e.com"));
        assert!(tree.nearest("u@e.com/x").is_none());
    }
}
