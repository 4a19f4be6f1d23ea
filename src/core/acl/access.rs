// src/core/acl/access.rs

//! The access-level hierarchy (spec §3, §9 Open Questions).
//!
//! The source material exposed two overlapping variants of "access level":
//! a totally-ordered enum and a bit-flag set. This implementation picks the
//! totally-ordered form with `Create` as an intermediate level, per the
//! spec's explicit resolution, and applies it consistently everywhere.

use serde::{Deserialize, Serialize};

/// An access level, totally ordered: `Read < Create < Write < Admin`.
/// Each level implies every level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Create,
    Write,
    Admin,
}

impl AccessLevel {
    /// Whether `self` satisfies a request for `required`.
    pub fn satisfies(self, required: AccessLevel) -> bool {
        self >= required
    }
}
