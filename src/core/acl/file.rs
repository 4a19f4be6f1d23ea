// src/core/acl/file.rs

//! Parses the `syft.pub.yaml` convention (spec §6) into a `RuleSet` ready
//! for `AclService::add_ruleset`.

use super::rule::Rule;
use super::tree::RuleSet;
use crate::core::errors::CoreResult;
use crate::core::path;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RuleSetDoc {
    #[serde(default)]
    terminal: bool,
    rules: Vec<Rule>,
}

/// Parses an ACL file's YAML body into a `RuleSet`. The ruleset's path is
/// always the directory containing the file, derived from `key`, not a
/// field in the document (spec §6).
pub fn parse_ruleset(key: &str, body: &str) -> CoreResult<RuleSet> {
    let doc: RuleSetDoc = serde_yaml::from_str(body)?;
    Ok(RuleSet {
        path: directory_of(key),
        terminal: doc.terminal,
        rules: doc.rules,
    })
}

fn directory_of(key: &str) -> String {
    let normalized = path::normalize(key);
    let segments = path::segments(&normalized);
    if segments.len() <= 1 {
        String::new()
    } else {
        segments[..segments.len() - 1].join("/")
    }
}
