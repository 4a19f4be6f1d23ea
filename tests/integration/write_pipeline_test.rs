// tests/integration/write_pipeline_test.rs

//! End-to-end scenarios across the ACL engine, object store façade, and
//! realtime hub as wired together by the write pipeline (spec §4.14/§8).

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use syftbox_core::core::acl::{AclService, RuleSet, Rule, Access, Limits};
use syftbox_core::core::blob::{BlobIndex, BlobIndexConfig, BlobService, MemoryBackend};
use syftbox_core::core::hub::{ConnectionHandle, Hub, HotlinkRegistry, Payload};
use syftbox_core::core::pipeline::Pipeline;
use tokio::sync::mpsc;

async fn test_pipeline() -> (Arc<Pipeline>, Arc<Hub>, Arc<AclService>) {
    let acl = Arc::new(AclService::new());
    let backend = Arc::new(MemoryBackend::new());
    let index = Arc::new(BlobIndex::connect(&BlobIndexConfig::default()).await.unwrap());
    let blob = Arc::new(BlobService::new(backend, index, Duration::from_secs(900)));
    let hub = Arc::new(Hub::new(64));
    let hotlinks = Arc::new(HotlinkRegistry::new());
    let pipeline = Pipeline::new(acl.clone(), blob, hub.clone(), hotlinks);
    (pipeline, hub, acl)
}

fn connect(hub: &Hub, conn_id: &str, user: &str) -> mpsc::Receiver<syftbox_core::core::hub::Envelope> {
    let (tx, rx) = mpsc::channel(16);
    hub.register(ConnectionHandle::new(conn_id, user, tx));
    rx
}

#[tokio::test]
async fn write_denied_without_access_sends_an_error_and_never_persists() {
    let (pipeline, hub, _acl) = test_pipeline().await;
    let mut rx = connect(&hub, "c1", "stranger@e.com");

    pipeline
        .handle_file_write("c1", "stranger@e.com", "req1", "owner@e.com/secret.txt", Bytes::from_static(b"x"), 1)
        .await;

    let envelope = rx.try_recv().unwrap();
    match envelope.payload {
        Payload::Error { status, .. } => assert_eq!(status, 403),
        other => panic!("expected Error payload, got {other:?}"),
    }
}

#[tokio::test]
async fn owner_write_is_acked_and_broadcast_to_read_eligible_peers() {
    let (pipeline, hub, acl) = test_pipeline().await;

    acl.add_ruleset(RuleSet {
        path: "owner@e.com".to_string(),
        terminal: false,
        rules: vec![Rule {
            pattern: "*.txt".to_string(),
            access: Access::public_read(),
            limits: Limits::default(),
        }],
    })
    .unwrap();

    let mut owner_rx = connect(&hub, "c1", "owner@e.com");
    let mut reader_rx = connect(&hub, "c2", "reader@e.com");

    pipeline
        .handle_file_write("c1", "owner@e.com", "req1", "owner@e.com/a.txt", Bytes::from_static(b"hello"), 5)
        .await;

    // Non-ACL writes persist asynchronously; give the spawned task a turn.
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let ack = owner_rx.try_recv().unwrap();
    assert!(matches!(ack.payload, Payload::Ack { .. }));

    let broadcast = reader_rx.try_recv().unwrap();
    match broadcast.payload {
        Payload::FileWrite { path, content, .. } => {
            assert_eq!(path, "owner@e.com/a.txt");
            assert_eq!(&content[..], b"hello");
        }
        other => panic!("expected FileWrite payload, got {other:?}"),
    }

    // The sender itself is skipped in the broadcast fan-out.
    assert!(owner_rx.try_recv().is_err());
}

#[tokio::test]
async fn acl_file_write_applies_before_being_acknowledged() {
    let (pipeline, hub, acl) = test_pipeline().await;
    let mut owner_rx = connect(&hub, "c1", "owner@e.com");

    let body = b"rules:\n  - pattern: \"*.txt\"\n    access:\n      read: [\"*\"]\n".to_vec();
    pipeline
        .handle_file_write("c1", "owner@e.com", "req1", "owner@e.com/syft.pub.yaml", Bytes::from(body), 10)
        .await;

    let ack = owner_rx.try_recv().unwrap();
    assert!(matches!(ack.payload, Payload::Ack { .. }));

    // The ruleset is live immediately: a read check for anyone now succeeds.
    let check = acl.check_access(&syftbox_core::core::acl::CheckRequest {
        path: "owner@e.com/note.txt".to_string(),
        user: "anyone@e.com".to_string(),
        level: syftbox_core::core::acl::AccessLevel::Read,
        file: None,
    });
    assert!(check.is_ok());
}

#[tokio::test]
async fn hotlink_session_delivers_data_only_to_accepted_read_eligible_peers() {
    let (pipeline, hub, acl) = test_pipeline().await;

    acl.add_ruleset(RuleSet {
        path: "owner@e.com".to_string(),
        terminal: false,
        rules: vec![Rule {
            pattern: "**".to_string(),
            access: Access::public_read_write(),
            limits: Limits::default(),
        }],
    })
    .unwrap();

    let _owner_rx = connect(&hub, "origin", "owner@e.com");
    let mut peer_rx = connect(&hub, "peer", "reader@e.com");

    pipeline.handle_hotlink_open("origin", "owner@e.com", "sess1", "owner@e.com/stream");
    // The peer receives the open notification (read-eligible, not the sender).
    let open_msg = peer_rx.try_recv().unwrap();
    assert!(matches!(open_msg.payload, Payload::HotlinkOpen { .. }));

    pipeline.handle_hotlink_accept("sess1", "peer", "reader@e.com");
    pipeline.handle_hotlink_data("sess1", Bytes::from_static(b"chunk"));

    let data_msg = peer_rx.try_recv().unwrap();
    match data_msg.payload {
        Payload::HotlinkData { content, .. } => assert_eq!(&content[..], b"chunk"),
        other => panic!("expected HotlinkData payload, got {other:?}"),
    }

    pipeline.handle_hotlink_close("sess1");
    let close_msg = peer_rx.try_recv().unwrap();
    assert!(matches!(close_msg.payload, Payload::HotlinkClose { .. }));
}
