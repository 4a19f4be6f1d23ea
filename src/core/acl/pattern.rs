// src/core/acl/pattern.rs

//! Pattern matchers behind a common contract (spec §4.2): `Exact`, `Glob`
//! (doublestar semantics), and `Template` (per-requester expansion that
//! delegates to an inner `Exact`/`Glob` matcher).

use super::template::TemplateContext;
use globset::{GlobBuilder, GlobMatcher};

/// The kind of a compiled pattern matcher, exposed for diagnostics and for
/// the specificity scorer (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Exact,
    Glob,
    Template,
}

/// A compiled pattern matcher. Matchers are tagged variants chosen once at
/// rule-compile time (spec §9).
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Glob { source: String, compiled: GlobMatcher },
    Template(String),
}

impl Matcher {
    pub fn kind(&self) -> MatcherKind {
        match self {
            Matcher::Exact(_) => MatcherKind::Exact,
            Matcher::Glob { .. } => MatcherKind::Glob,
            Matcher::Template(_) => MatcherKind::Template,
        }
    }

    /// Builds a matcher for `pattern`, applying the selection rule from
    /// spec §4.2: a pattern containing `{{` and `}}` is a `Template`; else
    /// a pattern containing any of `* ? [` is a `Glob`; else `Exact`.
    pub fn compile(pattern: &str) -> Result<Matcher, String> {
        if pattern.contains("{{") && pattern.contains("}}") {
            return Ok(Matcher::Template(pattern.to_string()));
        }
        if pattern.contains(['*', '?', '[']) {
            // `literal_separator` gives us doublestar semantics: `*` stays
            // within a path segment, `**` crosses segment boundaries.
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| e.to_string())?;
            return Ok(Matcher::Glob {
                source: pattern.to_string(),
                compiled: glob.compile_matcher(),
            });
        }
        Ok(Matcher::Exact(pattern.to_string()))
    }

    /// Matches `path` (already normalized) against this matcher. For a
    /// `Template`, `user_email` is used to expand the template before
    /// delegating to a freshly-built inner matcher (exact or glob).
    pub fn matches(&self, path: &str, user_email: &str) -> Result<bool, String> {
        match self {
            Matcher::Exact(p) => Ok(p == path),
            Matcher::Glob { compiled, .. } => Ok(compiled.is_match(path)),
            Matcher::Template(tpl) => {
                let ctx = TemplateContext::new(user_email);
                let Some(resolved) = ctx.expand(tpl) else {
                    return Ok(false);
                };
                let inner = Matcher::compile(&resolved)?;
                // A resolved template pattern is never itself a template.
                inner.matches(path, user_email)
            }
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Matcher::Exact(p) => p,
            Matcher::Glob { source, .. } => source,
            Matcher::Template(p) => p,
        }
    }
}
