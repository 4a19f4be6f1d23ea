// src/core/acl/template.rs

//! Expansion of `{{…}}` template expressions embedded in rule patterns
//! (spec §3/§4.2). Variables: `UserEmail`, `UserHash`, `Year`, `Month`,
//! `Date`. Functions: `sha2(s[,n])`, `upper(s)`, `lower(s)`.

use chrono::{Datelike, Utc};
use sha2::{Digest, Sha256};

/// The per-request context a template is expanded against.
pub struct TemplateContext<'a> {
    pub user_email: &'a str,
}

impl<'a> TemplateContext<'a> {
    pub fn new(user_email: &'a str) -> Self {
        Self { user_email }
    }

    fn resolve_variable(&self, name: &str, scratch: &mut String) -> Option<String> {
        let now = Utc::now();
        match name {
            "UserEmail" => Some(self.user_email.to_string()),
            "UserHash" => {
                scratch.clear();
                scratch.push_str(self.user_email);
                Some(sha2_hex(scratch)[..16].to_string())
            }
            "Year" => Some(format!("{:04}", now.year())),
            "Month" => Some(format!("{:02}", now.month())),
            "Date" => Some(format!("{:02}", now.day())),
            _ => None,
        }
    }

    /// Expands every `{{…}}` expression found in `pattern`, returning the
    /// resolved pattern string. A per-call scratch buffer keeps expansion
    /// constant-space aside from the resolved string, per spec §4.2.
    pub fn expand(&self, pattern: &str) -> Option<String> {
        let mut out = String::with_capacity(pattern.len());
        let mut scratch = String::new();
        let bytes = pattern.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
                let end = pattern[i + 2..].find("}}")? + i + 2;
                let expr = pattern[i + 2..end].trim();
                out.push_str(&self.eval(expr, &mut scratch)?);
                i = end + 2;
            } else {
                out.push(bytes[i] as char);
                i += 1;
            }
        }
        Some(out)
    }

    fn eval(&self, expr: &str, scratch: &mut String) -> Option<String> {
        let expr = expr.trim().trim_start_matches('.');
        if let Some(open) = expr.find('(') {
            if !expr.ends_with(')') {
                return None;
            }
            let func = &expr[..open];
            let args_str = &expr[open + 1..expr.len() - 1];
            let args: Vec<&str> = if args_str.trim().is_empty() {
                Vec::new()
            } else {
                args_str.split(',').map(|s| s.trim()).collect()
            };
            let first = args.first().map(|a| self.eval_atom(a, scratch))??;
            match func {
                "sha2" => {
                    let full = sha2_hex(&first);
                    let n = args
                        .get(1)
                        .and_then(|s| s.parse::<usize>().ok())
                        .unwrap_or(full.len());
                    Some(full[..n.min(full.len())].to_string())
                }
                "upper" => Some(first.to_uppercase()),
                "lower" => Some(first.to_lowercase()),
                _ => None,
            }
        } else {
            self.eval_atom(expr, scratch)
        }
    }

    fn eval_atom(&self, atom: &str, scratch: &mut String) -> Option<String> {
        let atom = atom.trim().trim_start_matches('.');
        self.resolve_variable(atom, scratch)
    }
}

fn sha2_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}
