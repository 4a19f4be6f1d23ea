// src/core/hub/hotlink.rs

//! Peer-mediated bulk transfer sessions (spec §3/§4.14): an
//! open/accept/reject/data/close state machine keyed by session id.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;

/// `{id, path, from_user, from_conn, created, accepted: map<conn_id, user>}`
/// (spec §3). The registry is the source of truth for which connections
/// have accepted a session; ACL enforcement on `data` delivery is the
/// caller's responsibility (the hotlink module stays ACL-agnostic).
#[derive(Debug, Clone)]
pub struct HotlinkSession {
    pub id: String,
    pub path: String,
    pub from_user: String,
    pub from_conn: String,
    pub created: String,
    accepted: HashMap<String, String>,
}

impl HotlinkSession {
    pub fn accepted_conns(&self) -> Vec<String> {
        self.accepted.keys().cloned().collect()
    }

    /// `(conn_id, user)` pairs for every accepted peer, used to re-check
    /// Read access at `data` delivery time (spec §4.14).
    pub fn accepted_entries(&self) -> Vec<(String, String)> {
        self.accepted.iter().map(|(c, u)| (c.clone(), u.clone())).collect()
    }
}

/// Tracks active hotlink sessions (spec §4.14).
#[derive(Debug, Default)]
pub struct HotlinkRegistry {
    sessions: DashMap<String, HotlinkSession>,
}

impl HotlinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session. The caller has already authorized `from_user` for
    /// `Write` on `path` (spec §4.14 step "open is permission-checked").
    pub fn open(&self, id: impl Into<String>, path: impl Into<String>, from_user: impl Into<String>, from_conn: impl Into<String>) {
        let id = id.into();
        self.sessions.insert(
            id.clone(),
            HotlinkSession {
                id,
                path: path.into(),
                from_user: from_user.into(),
                from_conn: from_conn.into(),
                created: Utc::now().to_rfc3339(),
                accepted: HashMap::new(),
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<HotlinkSession> {
        self.sessions.get(id).map(|s| s.clone())
    }

    /// Records a peer's acceptance. Returns `false` if the session is
    /// unknown (already closed or never opened).
    pub fn accept(&self, id: &str, conn_id: &str, user: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                session.accepted.insert(conn_id.to_string(), user.to_string());
                true
            }
            None => false,
        }
    }

    /// Tears down the session. Either side (the origin or an accepted
    /// peer) may close it; a reject from a peer that never accepted does
    /// not close the session for the others.
    pub fn close(&self, id: &str) -> Option<HotlinkSession> {
        self.sessions.remove(id).map(|(_, session)| session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_accept_data_close_lifecycle() {
        let registry = HotlinkRegistry::new();
        registry.open("s1", "alice@e.com/big.bin", "alice@e.com", "c-alice");

        assert!(registry.accept("s1", "c-bob", "bob@e.com"));
        assert!(!registry.accept("missing", "c-bob", "bob@e.com"));

        let session = registry.get("s1").unwrap();
        assert_eq!(session.accepted_conns(), vec!["c-bob".to_string()]);
        assert_eq!(session.from_user, "alice@e.com");

        let closed = registry.close("s1").unwrap();
        assert_eq!(closed.id, "s1");
        assert!(registry.get("s1").is_none());
    }

    #[test]
    fn reject_from_a_non_participant_does_not_affect_others() {
        let registry = HotlinkRegistry::new();
        registry.open("s1", "alice@e.com/big.bin", "alice@e.com", "c-alice");
        registry.accept("s1", "c-bob", "bob@e.com");

        // A reject is simply not recorded as an acceptance; the session
        // stays open for the peers that did accept.
        let session = registry.get("s1").unwrap();
        assert_eq!(session.accepted_conns().len(), 1);
    }
}
