// src/core/acl/node.rs

//! A point in the ACL path-trie (spec §3). A `Node` holds a
//! specificity-sorted rule list, a terminal flag, a monotonically
//! increasing version, and a child map.
//!
//! ACL evaluation is purely in-memory and never suspends (spec §5), so
//! nodes are guarded with `parking_lot::RwLock` rather than an async lock,
//! matching the teacher's own use of `parking_lot` for hot, non-suspending
//! paths.

use super::rule::Rule;
use super::specificity;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct NodeInner {
    terminal: bool,
    version: u16,
    rules: Vec<Arc<Rule>>,
    children: HashMap<String, Arc<Node>>,
}

/// A node in the ACL tree. `path` is the full owner-prefixed path this
/// node represents (e.g. `"user1@e.com/dir"`); the root node's path is
/// `""`.
pub struct Node {
    pub path: String,
    pub owner: String,
    pub depth: u8,
    inner: RwLock<NodeInner>,
}

impl Node {
    pub fn new_root() -> Arc<Node> {
        Arc::new(Node {
            path: String::new(),
            owner: String::new(),
            depth: 0,
            inner: RwLock::new(NodeInner {
                terminal: false,
                version: 0,
                rules: Vec::new(),
                children: HashMap::new(),
            }),
        })
    }

    fn new_child(path: String, owner: String, depth: u8) -> Arc<Node> {
        Arc::new(Node {
            path,
            owner,
            depth,
            inner: RwLock::new(NodeInner {
                terminal: false,
                version: 0,
                rules: Vec::new(),
                children: HashMap::new(),
            }),
        })
    }

    pub fn version(&self) -> u16 {
        self.inner.read().version
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.read().terminal
    }

    pub fn has_rules(&self) -> bool {
        !self.inner.read().rules.is_empty()
    }

    /// A snapshot of this node's rules, already sorted by descending
    /// specificity (insertion order preserved among ties).
    pub fn rules_snapshot(&self) -> Vec<Arc<Rule>> {
        self.inner.read().rules.clone()
    }

    pub fn child(&self, segment: &str) -> Option<Arc<Node>> {
        self.inner.read().children.get(segment).cloned()
    }

    fn child_count(&self) -> usize {
        self.inner.read().children.len()
    }

    /// Returns the existing child for `segment`, creating a non-terminal
    /// one if absent.
    fn get_or_create_child(self: &Arc<Self>, segment: &str, owner: &str) -> Arc<Node> {
        let mut inner = self.inner.write();
        if let Some(child) = inner.children.get(segment) {
            return child.clone();
        }
        let child_path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", self.path, segment)
        };
        let child = Node::new_child(child_path, owner.to_string(), self.depth + 1);
        inner.children.insert(segment.to_string(), child.clone());
        child
    }

    fn remove_child(&self, segment: &str) {
        self.inner.write().children.remove(segment);
    }

    fn bump_version(&self) {
        let mut inner = self.inner.write();
        inner.version = inner.version.wrapping_add(1);
    }

    /// Replaces this node's ruleset: sorts rules by descending specificity
    /// (stable, so ties preserve insertion order), sets the terminal flag,
    /// and bumps the version.
    fn set_rules(&self, rules: Vec<Rule>, terminal: bool) {
        let mut scored: Vec<(i64, Rule)> = rules
            .into_iter()
            .map(|r| (specificity::score(&r.pattern), r))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut inner = self.inner.write();
        inner.rules = scored.into_iter().map(|(_, r)| Arc::new(r)).collect();
        inner.terminal = terminal;
        inner.version = inner.version.wrapping_add(1);
    }

    /// Clears this node's rules (used by `RemoveRuleSet`); leaves the
    /// terminal flag untouched since a cleared node is a pass-through,
    /// not re-classified.
    fn clear_rules(&self) {
        let mut inner = self.inner.write();
        inner.rules.clear();
        inner.terminal = false;
        inner.version = inner.version.wrapping_add(1);
    }
}

/// Walks from `node` along `segments`, creating non-terminal intermediate
/// children as needed, and stores `rules`/`terminal` on the final node.
/// Returns `Err` without mutating the tree if any strict ancestor along
/// the path is terminal.
pub(super) fn insert_along(
    root: &Arc<Node>,
    owner: &str,
    segments: &[&str],
    rules: Vec<Rule>,
    terminal: bool,
) -> Result<Arc<Node>, &'static str> {
    // Pre-flight: verify no strict ancestor is terminal before mutating.
    let mut probe = root.clone();
    for seg in segments {
        if probe.is_terminal() {
            return Err("insertion beneath a terminal node is rejected");
        }
        match probe.child(seg) {
            Some(child) => probe = child,
            None => break,
        }
    }

    let mut node = root.clone();
    for seg in segments {
        node = node.get_or_create_child(seg, owner);
    }
    node.set_rules(rules, terminal);
    Ok(node)
}

/// Traverses to the node at `segments` (if any), clears its rules, and
/// detaches it from its parent if it has no remaining children. Bumps
/// versions along the touched path. Returns whether a node was found.
pub(super) fn remove_along(root: &Arc<Node>, segments: &[&str]) -> bool {
    let mut path: Vec<Arc<Node>> = vec![root.clone()];
    let mut node = root.clone();
    for seg in segments {
        match node.child(seg) {
            Some(child) => {
                path.push(child.clone());
                node = child;
            }
            None => return false,
        }
    }

    node.clear_rules();
    if node.child_count() == 0 && path.len() >= 2 {
        let parent = &path[path.len() - 2];
        let last_segment = segments.last().unwrap();
        parent.remove_child(last_segment);
    }
    // Bump ancestor versions (the target node already bumped itself in
    // `clear_rules`) so cached entries rooted above the removed node
    // observe the mutation too.
    for ancestor in &path[..path.len().saturating_sub(1)] {
        ancestor.bump_version();
    }
    true
}
