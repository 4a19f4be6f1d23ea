// src/core/acl/mod.rs

//! The access-control engine: pattern matchers, the path-trie, a
//! version-checked cache, and the orchestrating service (spec §4.1-§4.6).

pub mod access;
pub mod cache;
pub mod file;
pub mod node;
pub mod pattern;
pub mod rule;
pub mod service;
pub mod specificity;
pub mod template;
pub mod tree;

pub use access::AccessLevel;
pub use file::parse_ruleset;
pub use rule::{Access, CompiledRule, FileDescriptor, Limits, Rule, EVERYONE, USER_TOKEN};
pub use service::{is_acl_file, AclService, CheckRequest, ACL_FILE_NAME};
pub use tree::RuleSet;
