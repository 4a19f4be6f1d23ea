// src/core/hub/message.rs

//! The websocket wire envelope and its message variants (spec §3/§6).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// `{id, typ, data}`: `id` is a short opaque token used for ACK/NACK
/// correlation; `data` is schema-discriminated on `typ` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Envelope {
    pub fn new(id: impl Into<String>, payload: Payload) -> Self {
        Self { id: id.into(), payload }
    }
}

/// Message variants used by the core (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "typ", content = "data")]
pub enum Payload {
    FileWrite {
        path: String,
        length: i64,
        content: Bytes,
    },
    Ack {
        id: String,
    },
    Nack {
        id: String,
        reason: String,
    },
    Error {
        status: u16,
        path: String,
        message: String,
    },
    #[serde(rename = "ACLManifest")]
    AclManifest {
        datasite: String,
        #[serde(rename = "for")]
        for_user: String,
        for_hash: String,
        acl_order: Vec<String>,
    },
    HotlinkOpen {
        session_id: String,
        path: String,
    },
    HotlinkAccept {
        session_id: String,
    },
    HotlinkReject {
        session_id: String,
        reason: String,
    },
    HotlinkData {
        session_id: String,
        content: Bytes,
    },
    HotlinkClose {
        session_id: String,
    },
    HotlinkSignal {
        session_id: String,
        signal: String,
    },
}
