// src/core/pipeline.rs

//! The write pipeline: the host server composition that ties the ACL
//! engine, the blob service, and the hub together for `FileWrite` and
//! hotlink traffic (spec §4.14).

use crate::core::acl::{is_acl_file, parse_ruleset, AccessLevel, AclService, CheckRequest};
use crate::core::blob::BlobService;
use crate::core::errors::CoreError;
use crate::core::hub::connection::ConnectionHandle;
use crate::core::hub::hotlink::HotlinkRegistry;
use crate::core::hub::message::{Envelope, Payload};
use crate::core::hub::Hub;
use bytes::Bytes;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Maps a `CoreError` to the wire `Error` message's status code.
fn status_for(error: &CoreError) -> u16 {
    match error {
        CoreError::NoReadAccess | CoreError::NoWriteAccess | CoreError::NoAdminAccess => 403,
        CoreError::NotFound | CoreError::NoRule => 404,
        CoreError::InvalidAccessLevel
        | CoreError::InvalidRuleset(_)
        | CoreError::MaxDepthExceeded
        | CoreError::FileSizeExceeded
        | CoreError::DirsNotAllowed
        | CoreError::SymlinksNotAllowed
        | CoreError::InvalidKey(_) => 400,
        CoreError::Backend(_) | CoreError::Index(_) | CoreError::Io(_) | CoreError::Internal(_) => 500,
    }
}

/// Orchestrates `FileWrite` persistence/broadcast and hotlink session
/// traffic (spec §4.14). Constructed behind an `Arc` so async writes can
/// be handed to `tokio::spawn` without re-threading every collaborator.
pub struct Pipeline {
    acl: Arc<AclService>,
    blob: Arc<BlobService>,
    hub: Arc<Hub>,
    hotlinks: Arc<HotlinkRegistry>,
}

impl Pipeline {
    pub fn new(acl: Arc<AclService>, blob: Arc<BlobService>, hub: Arc<Hub>, hotlinks: Arc<HotlinkRegistry>) -> Arc<Self> {
        Arc::new(Self { acl, blob, hub, hotlinks })
    }

    fn send_error(&self, conn_id: &str, id: &str, path: &str, error: &CoreError) {
        self.hub.send_message(
            conn_id,
            Envelope::new(
                id.to_string(),
                Payload::Error {
                    status: status_for(error),
                    path: path.to_string(),
                    message: error.to_string(),
                },
            ),
        );
    }

    /// Handles an inbound `FileWrite` (spec §4.14 steps 1-3).
    pub async fn handle_file_write(
        self: &Arc<Self>,
        conn_id: &str,
        user: &str,
        id: &str,
        path: &str,
        content: Bytes,
        length: i64,
    ) {
        let check = CheckRequest {
            path: path.to_string(),
            user: user.to_string(),
            level: AccessLevel::Write,
            file: None,
        };
        if let Err(e) = self.acl.check_access(&check) {
            self.send_error(conn_id, id, path, &e);
            return;
        }

        if is_acl_file(path) {
            self.persist_and_ack(conn_id, user, id, path, content, length).await;
        } else {
            let this = self.clone();
            let conn_id = conn_id.to_string();
            let user = user.to_string();
            let id = id.to_string();
            let path = path.to_string();
            tokio::spawn(async move {
                this.persist_and_ack(&conn_id, &user, &id, &path, content, length).await;
            });
        }
    }

    /// Persists the write and, for ACL files, applies the parsed ruleset
    /// before anything is acknowledged or broadcast (spec §4.14 step 2).
    async fn persist_and_ack(&self, conn_id: &str, user: &str, id: &str, path: &str, content: Bytes, length: i64) {
        let info = match self.blob.put_object(path, content.clone()).await {
            Ok(info) => info,
            Err(e) => {
                self.hub.send_message(
                    conn_id,
                    Envelope::new(id.to_string(), Payload::Nack { id: id.to_string(), reason: e.to_string() }),
                );
                return;
            }
        };
        let _ = info;

        if is_acl_file(path) {
            let body = String::from_utf8_lossy(&content).into_owned();
            if let Err(e) = parse_ruleset(path, &body).and_then(|ruleset| self.acl.add_ruleset(ruleset)) {
                self.hub.send_message(
                    conn_id,
                    Envelope::new(id.to_string(), Payload::Nack { id: id.to_string(), reason: e.to_string() }),
                );
                return;
            }
        }

        self.hub
            .send_message(conn_id, Envelope::new(id.to_string(), Payload::Ack { id: id.to_string() }));
        self.broadcast_write(conn_id, path, length, content);
    }

    /// Broadcasts a persisted write, skipping the sender and
    /// unconditionally forwarding ACL files; other recipients are
    /// filtered by a Read check (spec §4.14 step 3).
    fn broadcast_write(&self, sender_conn: &str, path: &str, length: i64, content: Bytes) {
        let msg = Envelope::new(
            short_id(),
            Payload::FileWrite { path: path.to_string(), length, content },
        );
        let acl_file = is_acl_file(path);
        let acl = self.acl.clone();
        let path = path.to_string();
        let sender_conn = sender_conn.to_string();

        self.hub.broadcast_filtered(&msg, move |handle: &ConnectionHandle| {
            if handle.conn_id == sender_conn {
                return false;
            }
            if acl_file {
                return true;
            }
            acl.check_access(&CheckRequest {
                path: path.clone(),
                user: handle.client_info.user.clone(),
                level: AccessLevel::Read,
                file: None,
            })
            .is_ok()
        });
    }

    /// Opens a hotlink session: authorizes the origin for Write, then
    /// notifies Read-eligible connections (spec §4.14).
    pub fn handle_hotlink_open(&self, conn_id: &str, user: &str, session_id: &str, path: &str) {
        let check = CheckRequest {
            path: path.to_string(),
            user: user.to_string(),
            level: AccessLevel::Write,
            file: None,
        };
        if let Err(e) = self.acl.check_access(&check) {
            self.send_error(conn_id, session_id, path, &e);
            return;
        }

        self.hotlinks.open(session_id, path, user, conn_id);

        let msg = Envelope::new(
            short_id(),
            Payload::HotlinkOpen { session_id: session_id.to_string(), path: path.to_string() },
        );
        let acl = self.acl.clone();
        let path = path.to_string();
        let sender_conn = conn_id.to_string();
        self.hub.broadcast_filtered(&msg, move |handle: &ConnectionHandle| {
            if handle.conn_id == sender_conn {
                return false;
            }
            acl.check_access(&CheckRequest {
                path: path.clone(),
                user: handle.client_info.user.clone(),
                level: AccessLevel::Read,
                file: None,
            })
            .is_ok()
        });
    }

    /// Routes an `accept` to the session's origin connection.
    pub fn handle_hotlink_accept(&self, session_id: &str, conn_id: &str, user: &str) {
        if !self.hotlinks.accept(session_id, conn_id, user) {
            warn!(session_id, "hotlink accept for unknown session");
            return;
        }
        if let Some(session) = self.hotlinks.get(session_id) {
            self.hub.send_message(
                &session.from_conn,
                Envelope::new(short_id(), Payload::HotlinkAccept { session_id: session_id.to_string() }),
            );
        }
    }

    /// Routes a `reject` to the session's origin connection. The session
    /// itself stays open for any peer that already accepted.
    pub fn handle_hotlink_reject(&self, session_id: &str, reason: &str) {
        let Some(session) = self.hotlinks.get(session_id) else {
            return;
        };
        self.hub.send_message(
            &session.from_conn,
            Envelope::new(
                short_id(),
                Payload::HotlinkReject { session_id: session_id.to_string(), reason: reason.to_string() },
            ),
        );
    }

    /// Fans out a `data` frame from the session's origin to every accepted
    /// peer that still passes a Read check at delivery time (spec §4.14).
    pub fn handle_hotlink_data(&self, session_id: &str, content: Bytes) {
        let Some(session) = self.hotlinks.get(session_id) else {
            return;
        };
        let msg = Envelope::new(
            short_id(),
            Payload::HotlinkData { session_id: session_id.to_string(), content },
        );
        for (conn_id, user) in session.accepted_entries() {
            let allowed = self
                .acl
                .check_access(&CheckRequest {
                    path: session.path.clone(),
                    user,
                    level: AccessLevel::Read,
                    file: None,
                })
                .is_ok();
            if allowed {
                self.hub.send_message(&conn_id, msg.clone());
            }
        }
    }

    /// Tears down a session from either side and notifies every other
    /// participant.
    pub fn handle_hotlink_close(&self, session_id: &str) {
        let Some(session) = self.hotlinks.close(session_id) else {
            return;
        };
        let msg = Envelope::new(short_id(), Payload::HotlinkClose { session_id: session_id.to_string() });
        self.hub.send_message(&session.from_conn, msg.clone());
        for conn_id in session.accepted_conns() {
            self.hub.send_message(&conn_id, msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acl::{Access, Limits, Rule, RuleSet};
    use crate::core::blob::{BlobIndex, BlobIndexConfig, MemoryBackend};
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn pipeline_with_public_rule(owner: &str) -> (Arc<Pipeline>, Arc<Hub>) {
        let acl = Arc::new(AclService::new());
        acl.add_ruleset(RuleSet {
            path: owner.to_string(),
            terminal: false,
            rules: vec![Rule {
                pattern: "**".to_string(),
                access: Access::public_read_write(),
                limits: Limits::default(),
            }],
        })
        .unwrap();

        let backend = Arc::new(MemoryBackend::new());
        let index = Arc::new(BlobIndex::connect(&BlobIndexConfig::default()).await.unwrap());
        let blob = Arc::new(BlobService::new(backend, index, Duration::from_secs(900)));
        let hub = Arc::new(Hub::new(16));
        let hotlinks = Arc::new(HotlinkRegistry::new());

        (Pipeline::new(acl, blob, hub.clone(), hotlinks), hub)
    }

    fn register(hub: &Hub, conn_id: &str, user: &str) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(16);
        hub.register(ConnectionHandle::new(conn_id, user, tx));
        rx
    }

    #[tokio::test]
    async fn acl_file_write_applies_ruleset_before_broadcast() {
        let (pipeline, hub) = pipeline_with_public_rule("alice@e.com").await;
        let mut sender_rx = register(&hub, "c-alice", "alice@e.com");
        let mut other_rx = register(&hub, "c-bob", "bob@e.com");

        let body = b"terminal: false\nrules:\n  - pattern: \"*.secret\"\n    access:\n      read: []\n      write: []\n      admin: []\n";
        pipeline
            .handle_file_write(
                "c-alice",
                "alice@e.com",
                "req1",
                "alice@e.com/syft.pub.yaml",
                Bytes::from_static(body),
                body.len() as i64,
            )
            .await;

        let ack = sender_rx.recv().await.unwrap();
        assert!(matches!(ack.payload, Payload::Ack { .. }));

        let broadcast = other_rx.recv().await.unwrap();
        assert!(matches!(broadcast.payload, Payload::FileWrite { .. }));
    }

    #[tokio::test]
    async fn write_denied_without_access_sends_error() {
        let acl = Arc::new(AclService::new());
        acl.add_ruleset(RuleSet {
            path: "alice@e.com".to_string(),
            terminal: false,
            rules: vec![Rule {
                pattern: "**".to_string(),
                access: Access::private(),
                limits: Limits::default(),
            }],
        })
        .unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let index = Arc::new(BlobIndex::connect(&BlobIndexConfig::default()).await.unwrap());
        let blob = Arc::new(BlobService::new(backend, index, Duration::from_secs(900)));
        let hub = Arc::new(Hub::new(16));
        let hotlinks = Arc::new(HotlinkRegistry::new());
        let pipeline = Pipeline::new(acl, blob, hub.clone(), hotlinks);

        let mut rx = register(&hub, "c-mallory", "mallory@e.com");
        pipeline
            .handle_file_write(
                "c-mallory",
                "mallory@e.com",
                "req1",
                "alice@e.com/secret.txt",
                Bytes::from_static(b"x"),
                1,
            )
            .await;

        let reply = rx.recv().await.unwrap();
        assert!(matches!(reply.payload, Payload::Error { status: 403, .. }));
    }

    #[tokio::test]
    async fn hotlink_open_accept_data_close_flow() {
        let (pipeline, hub) = pipeline_with_public_rule("alice@e.com").await;
        let mut bob_rx = register(&hub, "c-bob", "bob@e.com");
        let mut alice_rx = register(&hub, "c-alice", "alice@e.com");

        pipeline.handle_hotlink_open("c-alice", "alice@e.com", "s1", "alice@e.com/big.bin");
        let notice = bob_rx.recv().await.unwrap();
        assert!(matches!(notice.payload, Payload::HotlinkOpen { .. }));

        pipeline.handle_hotlink_accept("s1", "c-bob", "bob@e.com");
        let accept_notice = alice_rx.recv().await.unwrap();
        assert!(matches!(accept_notice.payload, Payload::HotlinkAccept { .. }));

        pipeline.handle_hotlink_data("s1", Bytes::from_static(b"chunk"));
        let data = bob_rx.recv().await.unwrap();
        assert!(matches!(data.payload, Payload::HotlinkData { .. }));

        pipeline.handle_hotlink_close("s1");
        let close_alice = alice_rx.recv().await.unwrap();
        let close_bob = bob_rx.recv().await.unwrap();
        assert!(matches!(close_alice.payload, Payload::HotlinkClose { .. }));
        assert!(matches!(close_bob.payload, Payload::HotlinkClose { .. }));
    }
}
