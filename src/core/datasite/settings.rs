// src/core/datasite/settings.rs

//! Parses the per-owner `settings.yaml` convention and applies the vanity
//! domain ownership check (spec §4.12/§6).

use serde::Deserialize;
use std::collections::HashMap;

/// The literal `domains` map, keyed by either a 16-hex hash or the
/// `"default"` sentinel, valued by the sub-path to expose.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub domains: HashMap<String, String>,
}

/// Parses `settings.yaml`'s body. Malformed documents are tolerated as "no
/// vanity domains" rather than an error (spec §6/§7).
pub fn parse_settings(body: &str) -> Option<Settings> {
    serde_yaml::from_str(body).ok()
}

/// Expands the literal `domains` map into concrete `(domain, path)` pairs,
/// resolving the `"default"` key to `{hash}.{main_domain}` (spec §6).
pub fn expand_domains(settings: &Settings, hash: &str, main_domain: &str) -> Vec<(String, String)> {
    settings
        .domains
        .iter()
        .map(|(domain, path)| {
            let resolved = if domain == "default" {
                format!("{hash}.{main_domain}")
            } else {
                domain.clone()
            };
            (resolved, path.clone())
        })
        .collect()
}

/// Whether `domain` may be claimed as a vanity domain by the owner
/// identified by `owner_hash` (spec §4.12).
pub fn is_domain_allowed(domain: &str, owner_hash: &str, main_domain: &str) -> bool {
    let own = format!("{owner_hash}.{main_domain}");
    if domain == own {
        return true;
    }
    if domain == main_domain {
        return false;
    }
    if domain == format!("www.{main_domain}") {
        return false;
    }
    if let Some(leaf) = domain.strip_suffix(&format!(".{main_domain}")) {
        if is_valid_hash_label(leaf) {
            return false;
        }
    }
    true
}

fn is_valid_hash_label(label: &str) -> bool {
    label.len() == 16 && label.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_document() {
        let body = "domains:\n  default: /public\n  abc.example.com: /shared\n";
        let settings = parse_settings(body).unwrap();
        assert_eq!(settings.domains.get("default"), Some(&"/public".to_string()));
    }

    #[test]
    fn malformed_document_is_tolerated() {
        assert!(parse_settings("not: [valid: yaml:").is_none());
    }

    #[test]
    fn default_expands_to_hash_domain() {
        let settings = Settings {
            domains: HashMap::from([("default".to_string(), "/public".to_string())]),
        };
        let expanded = expand_domains(&settings, "0123456789abcdef", "syftbox.net");
        assert_eq!(
            expanded,
            vec![("0123456789abcdef.syftbox.net".to_string(), "/public".to_string())]
        );
    }

    #[test]
    fn ownership_check_rules() {
        let hash = "0123456789abcdef";
        let other_hash = "fedcba9876543210";
        let main = "syftbox.net";

        assert!(is_domain_allowed(&format!("{hash}.{main}"), hash, main));
        assert!(!is_domain_allowed(main, hash, main));
        assert!(!is_domain_allowed(&format!("www.{main}"), hash, main));
        assert!(!is_domain_allowed(&format!("{other_hash}.{main}"), hash, main));
        assert!(is_domain_allowed("custom-domain.com", hash, main));
    }
}
