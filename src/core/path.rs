// src/core/path.rs

//! Path normalization and segmentation shared by the ACL tree and the blob
//! key grammar. Canonical form is forward-slash, no leading slash, with
//! `.`/`..` segments collapsed (spec §4.1).

/// Normalizes a path into canonical form: forward slashes, no leading
/// slash, `.` segments dropped and `..` segments collapsed against the
/// preceding segment where possible.
pub fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split(['/', '\\']) {
        match seg {
            "" | "." => continue,
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

/// Splits an already-normalized path into its segments.
pub fn segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// Joins a base path and a sub-path, tolerating sub-paths that themselves
/// contain slashes, and re-normalizes the result.
pub fn join(base: &str, sub: &str) -> String {
    if base.is_empty() {
        return normalize(sub);
    }
    if sub.is_empty() {
        return normalize(base);
    }
    normalize(&format!("{base}/{sub}"))
}

/// The first path segment, which is always the owning principal's id for
/// any key or rule path in this system.
pub fn owner_segment(path: &str) -> Option<&str> {
    segments(path).into_iter().next()
}
