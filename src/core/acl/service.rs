// src/core/acl/service.rs

//! Orchestrates the tree and cache, applying owner bypass, ACL-file
//! elevation, and limit checks (spec §4.6).

use super::access::AccessLevel;
use super::cache::AclCache;
use super::rule::{Access, CompiledRule, FileDescriptor};
use super::tree::{Request as TreeRequest, RuleSet, Tree};
use crate::core::errors::{CoreError, CoreResult};
use crate::core::metrics;
use crate::core::path;
use std::sync::Arc;
use tracing::debug;

/// The conventional ACL-file name (spec §6): any object whose key's final
/// segment equals this is treated as an ACL file.
pub const ACL_FILE_NAME: &str = "syft.pub.yaml";

/// A permission check request (spec §4.6).
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub path: String,
    pub user: String,
    pub level: AccessLevel,
    pub file: Option<FileDescriptor>,
}

/// Whether `path`'s final segment is the ACL file name (spec §6).
pub fn is_acl_file(path: &str) -> bool {
    path.rsplit('/').next() == Some(ACL_FILE_NAME)
}

/// Applies the size/dir/symlink limits from a rule (spec §4.6 step 4).
fn check_limits(limits: super::rule::Limits, path: &str, file: &FileDescriptor) -> CoreResult<()> {
    if limits.max_file_size > 0 && file.size > limits.max_file_size {
        return Err(CoreError::FileSizeExceeded);
    }
    if !limits.allow_dirs && (file.is_dir || path.contains('/')) {
        return Err(CoreError::DirsNotAllowed);
    }
    if !limits.allow_symlinks && file.is_symlink {
        return Err(CoreError::SymlinksNotAllowed);
    }
    Ok(())
}

/// Checks whether `access`, with the `USER` token resolved against
/// `user_id`, permits `level` (spec §4.6 step 5). Admin implies write
/// implies create implies read.
fn evaluate_permission(access: &Access, user_id: &str, level: AccessLevel) -> CoreResult<()> {
    let resolved = access.resolve_user_token(user_id);

    let is_admin = Access::set_allows(&resolved.admin, user_id);
    let is_writer = is_admin || Access::set_allows(&resolved.write, user_id);
    let is_reader = is_writer || Access::set_allows(&resolved.read, user_id);

    match level {
        AccessLevel::Admin if !is_admin => Err(CoreError::NoAdminAccess),
        AccessLevel::Write | AccessLevel::Create if !is_writer => Err(CoreError::NoWriteAccess),
        AccessLevel::Read if !is_reader => Err(CoreError::NoReadAccess),
        _ => Ok(()),
    }
}

/// Orchestrates the ACL tree and cache to answer permission checks, and
/// owns ruleset ingestion (spec §4.4-§4.6).
pub struct AclService {
    tree: Tree,
    cache: AclCache,
}

impl Default for AclService {
    fn default() -> Self {
        Self::new()
    }
}

impl AclService {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            cache: AclCache::new(),
        }
    }

    /// Adds a ruleset to the tree and invalidates the cache under its
    /// path prefix (spec §4.4/§4.5).
    pub fn add_ruleset(&self, ruleset: RuleSet) -> CoreResult<()> {
        let prefix = path::normalize(&ruleset.path);
        self.tree.insert_ruleset(ruleset)?;
        self.cache.delete_prefix(&prefix);
        Ok(())
    }

    /// Removes the ruleset rooted at `path` and invalidates the cache
    /// under that prefix.
    pub fn remove_ruleset(&self, path: &str) -> bool {
        let normalized = path::normalize(path);
        let removed = self.tree.remove_ruleset(&normalized);
        self.cache.delete_prefix(&normalized);
        removed
    }

    /// Resolves the effective compiled rule for `path`/`user`, consulting
    /// the cache first and recomputing on a miss or stale hit (spec
    /// §4.4/§4.5).
    pub fn resolve_rule(&self, path: &str, user: &str) -> CoreResult<Arc<CompiledRule>> {
        let normalized = path::normalize(path);

        if let Some(node) = self.tree.nearest(&normalized) {
            if let Some(hit) = self.cache.get(&normalized, node.version()) {
                metrics::acl_cache_hit();
                return Ok(hit);
            }
        }
        metrics::acl_cache_miss();

        let compiled = self.tree.resolve(&TreeRequest {
            path: normalized.clone(),
            user: user.to_string(),
        })?;
        let compiled = Arc::new(compiled);
        self.cache.set(normalized, compiled.clone());
        Ok(compiled)
    }

    /// The main permission-checking entry point (spec §4.6).
    pub fn check_access(&self, request: &CheckRequest) -> CoreResult<()> {
        let normalized = path::normalize(&request.path);

        // Step 1: owner bypass.
        if let Some(owner) = path::owner_segment(&normalized) {
            if owner == request.user {
                metrics::acl_check(true);
                return Ok(());
            }
        }

        // Step 2: resolve effective rule.
        let compiled = match self.resolve_rule(&normalized, &request.user) {
            Ok(rule) => rule,
            Err(e) => {
                metrics::acl_check(false);
                return Err(e);
            }
        };

        // Step 3: ACL-file elevation.
        let mut level = request.level;
        if is_acl_file(&normalized) && level >= AccessLevel::Create {
            level = AccessLevel::Admin;
        }

        // Step 4: limit checks (only for Create-and-above requests).
        if level >= AccessLevel::Create {
            if let Some(file) = &request.file {
                if let Err(e) = check_limits(compiled.rule.limits, &normalized, file) {
                    metrics::acl_check(false);
                    return Err(e);
                }
            }
        }

        // Step 5: permission evaluation.
        let result = evaluate_permission(&compiled.rule.access, &request.user, level);
        metrics::acl_check(result.is_ok());
        debug!(
            path = %normalized, user = %request.user, ?level, ok = result.is_ok(),
            "acl check"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acl::rule::{Access, Limits, Rule};

    fn service_with_ruleset(owner: &str, rules: Vec<Rule>, terminal: bool) -> AclService {
        let svc = AclService::new();
        svc.add_ruleset(RuleSet {
            path: owner.to_string(),
            terminal,
            rules,
        })
        .unwrap();
        svc
    }

    #[test]
    fn owner_bypass_with_size_limit() {
        let svc = service_with_ruleset(
            "user1@e.com",
            vec![Rule {
                pattern: "dir/*.txt".into(),
                access: Access::public_read_write(),
                limits: Limits {
                    max_file_size: 100,
                    allow_dirs: true,
                    allow_symlinks: false,
                },
            }],
            false,
        );

        let file = FileDescriptor {
            size: 200,
            is_dir: false,
            is_symlink: false,
        };
        assert!(svc
            .check_access(&CheckRequest {
                path: "user1@e.com/dir/big.txt".into(),
                user: "user1@e.com".into(),
                level: AccessLevel::Write,
                file: Some(file),
            })
            .is_ok());

        let err = svc
            .check_access(&CheckRequest {
                path: "user1@e.com/dir/big.txt".into(),
                user: "user2@e.com".into(),
                level: AccessLevel::Write,
                file: Some(file),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::FileSizeExceeded));
    }

    #[test]
    fn public_read_vs_write() {
        let svc = service_with_ruleset(
            "user1@e.com",
            vec![
                Rule {
                    pattern: "public/*.txt".into(),
                    access: Access::public_read(),
                    limits: Default::default(),
                },
                Rule {
                    pattern: "private/*.txt".into(),
                    access: Access::private(),
                    limits: Default::default(),
                },
            ],
            false,
        );

        assert!(svc
            .check_access(&CheckRequest {
                path: "user1@e.com/public/doc.txt".into(),
                user: "anyone@x.com".into(),
                level: AccessLevel::Read,
                file: None,
            })
            .is_ok());

        let err = svc
            .check_access(&CheckRequest {
                path: "user1@e.com/public/doc.txt".into(),
                user: "anyone@x.com".into(),
                level: AccessLevel::Write,
                file: None,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NoWriteAccess));

        let err = svc
            .check_access(&CheckRequest {
                path: "user1@e.com/private/secret.txt".into(),
                user: "anyone@x.com".into(),
                level: AccessLevel::Read,
                file: None,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NoReadAccess));
    }

    #[test]
    fn acl_file_elevation() {
        let svc = service_with_ruleset(
            "alice@e.com",
            vec![Rule {
                pattern: "**".into(),
                access: Access::public_read_write(),
                limits: Default::default(),
            }],
            false,
        );

        let err = svc
            .check_access(&CheckRequest {
                path: "alice@e.com/syft.pub.yaml".into(),
                user: "bob@e.com".into(),
                level: AccessLevel::Create,
                file: None,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NoAdminAccess));
    }

    #[test]
    fn template_pattern_scopes_to_requester() {
        let svc = service_with_ruleset(
            "access@e.com",
            vec![Rule {
                pattern: "private_{{.UserEmail}}/*".into(),
                access: Access::private(),
                limits: Default::default(),
            }],
            false,
        );
        // private() grants nobody read, so make the check about whether
        // the template even matches for the right user by using a rule
        // whose read set is EVERYONE instead.
        let svc2 = service_with_ruleset(
            "access@e.com",
            vec![Rule {
                pattern: "private_{{.UserEmail}}/*".into(),
                access: Access::public_read(),
                limits: Default::default(),
            }],
            false,
        );
        let _ = &svc;

        assert!(svc2
            .check_access(&CheckRequest {
                path: "access@e.com/private_user1@e.com/doc.txt".into(),
                user: "user1@e.com".into(),
                level: AccessLevel::Read,
                file: None,
            })
            .is_ok());

        let err = svc2
            .check_access(&CheckRequest {
                path: "access@e.com/private_user1@e.com/doc.txt".into(),
                user: "user2@e.com".into(),
                level: AccessLevel::Read,
                file: None,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NoRule));
    }

    #[test]
    fn ruleset_replace_bumps_version_and_invalidates_cache() {
        let svc = service_with_ruleset(
            "user1@e.com",
            vec![Rule {
                pattern: "*.md".into(),
                access: Access::public_read(),
                limits: Default::default(),
            }],
            false,
        );
        let first = svc.resolve_rule("user1@e.com/readme.md", "anyone@x.com").unwrap();
        assert_eq!(first.node_version, 1);

        svc.add_ruleset(RuleSet {
            path: "user1@e.com".into(),
            terminal: true,
            rules: vec![Rule {
                pattern: "*.md".into(),
                access: Access::private(),
                limits: Default::default(),
            }],
        })
        .unwrap();

        let second = svc.resolve_rule("user1@e.com/readme.md", "anyone@x.com").unwrap();
        assert_eq!(second.node_version, 2);
        assert!(second.rule.access.read.is_empty());
    }
}
